//! Battle round entity - One append-only round result of a battle.
//!
//! Effects are stored as comma-separated effect tags (e.g. `"critical_hit,shield"`).

use super::enums::Side;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Battle round database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "battle_rounds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub battle_id: i64,
    pub round_number: i32,
    pub challenger_power: i64,
    pub defender_power: i64,
    pub challenger_effects: String,
    pub defender_effects: String,
    pub winner: Side,
}

/// Defines relationships between `BattleRound` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each round belongs to one battle
    #[sea_orm(
        belongs_to = "super::battle::Entity",
        from = "Column::BattleId",
        to = "super::battle::Column::Id"
    )]
    Battle,
}

impl Related<super::battle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Battle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
