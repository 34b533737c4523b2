//! Battle entity - A challenge between two players and its outcome.
//!
//! The defender's card is bound only once the challenge is accepted. Round results
//! live in the `battle_rounds` table.

use super::enums::{BattleStatus, CardKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Battle database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "battles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub challenger_id: String,
    pub defender_id: String,
    pub challenger_card_kind: CardKind,
    pub challenger_card_id: i64,
    /// Whether the challenger fights with a special copy
    pub challenger_special: bool,
    pub defender_card_kind: Option<CardKind>,
    pub defender_card_id: Option<i64>,
    pub defender_special: bool,
    pub status: BattleStatus,
    pub challenger_wins: i32,
    pub defender_wins: i32,
    /// Discord user ID of the winner once completed
    pub winner_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Battle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One battle has many rounds
    #[sea_orm(has_many = "super::battle_round::Entity")]
    Rounds,
}

impl Related<super::battle_round::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rounds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
