//! Trade item entity - One (card, quantity) line on either side of a trade.

use super::enums::{CardKind, TradeSide};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trade item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trade_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trade_id: String,
    /// `Offered` lines move initiator to target, `Requested` lines move target to initiator
    pub side: TradeSide,
    pub card_kind: CardKind,
    pub card_id: i64,
    pub quantity: i64,
}

/// Defines relationships between `TradeItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one trade
    #[sea_orm(
        belongs_to = "super::trade::Entity",
        from = "Column::TradeId",
        to = "super::trade::Column::Id"
    )]
    Trade,
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
