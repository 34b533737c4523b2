//! Collection entry entity - How many copies of a card a user holds.
//!
//! An entry is keyed by user, card reference (`card_kind` + `card_id`) and the
//! special flag, so a special lineage and a regular lineage of the same card are
//! tracked separately. Entries whose quantity reaches zero are deleted.

use super::enums::CardKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Collection entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collection_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID of the owner
    pub user_id: String,
    /// Which catalog table `card_id` refers to
    pub card_kind: CardKind,
    pub card_id: i64,
    /// Number of copies held, always at least one while the row exists
    pub quantity: i64,
    /// Rarity-boosted variant; special copies are untradeable
    pub special: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
