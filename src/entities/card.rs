//! Card entity - The global catalog of regular cards.
//!
//! Each card has a unique name, a rarity tier, an optional element and a base power.
//! Cards are immutable once created except through explicit admin edits.

use super::enums::{Element, Rarity};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    /// Unique identifier for the card
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across the catalog
    #[sea_orm(unique)]
    pub name: String,
    /// Flavour text shown when the card is pulled
    pub description: String,
    /// Rarity tier gating pack odds and battle effects
    pub rarity: Rarity,
    /// Elemental type; `None` for cards that sit outside the type wheel
    pub element: Option<Element>,
    /// Set label (e.g. "Base", "Fusion")
    pub set_name: String,
    /// Optional image reference
    pub image_url: Option<String>,
    /// Base battle power, never negative
    pub power: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
