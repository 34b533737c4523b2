//! Fused card entity - Player-created cards produced by fusing two catalog cards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fused card database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fused_cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub set_name: String,
    pub image_url: Option<String>,
    /// Sum of both parents' power
    pub power: i64,
    /// Discord user ID of the player who performed the fusion
    pub fused_by: String,
    pub parent_a_id: i64,
    pub parent_b_id: i64,
    /// Copies of each parent consumed
    pub parent_quantity: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
