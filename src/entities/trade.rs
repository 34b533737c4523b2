//! Trade entity - A proposed bidirectional card exchange between two players.
//!
//! The primary key is a generated UUID string shown to users so they can accept or
//! cancel the offer. Card lines live in the `trade_items` table.

use super::enums::TradeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trade database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trades")]
pub struct Model {
    /// Generated UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub initiator_id: String,
    pub target_id: String,
    pub status: TradeStatus,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
    /// Discord user ID of whoever cancelled (or triggered the auto-cancel)
    pub cancelled_by: Option<String>,
}

/// Defines relationships between Trade and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One trade has many card lines
    #[sea_orm(has_many = "super::trade_item::Entity")]
    Items,
}

impl Related<super::trade_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
