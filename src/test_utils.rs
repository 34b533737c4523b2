//! Shared test utilities for `TcgBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test cards and collections with sensible defaults.

use crate::{
    core::{
        catalog::{self, CardRef, NewCard},
        collection,
    },
    entities::{Rarity, card},
    errors::Result,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a catalog card with sensible defaults.
///
/// # Defaults
/// * `element`: None
/// * `set_name`: "Base"
/// * `description`: "test card"
pub async fn create_test_card(
    db: &DatabaseConnection,
    name: &str,
    rarity: Rarity,
    power: i64,
) -> Result<card::Model> {
    catalog::create_card(
        db,
        NewCard {
            name: name.to_string(),
            description: "test card".to_string(),
            rarity,
            element: None,
            set_name: "Base".to_string(),
            image_url: None,
            power,
        },
    )
    .await
}

/// Gives `user_id` regular copies of a card.
pub async fn give_card(
    db: &DatabaseConnection,
    user_id: &str,
    card: &card::Model,
    quantity: i64,
) -> Result<()> {
    collection::add_units(db, user_id, CardRef::Card(card.id), false, quantity).await
}

/// Gives `user_id` special copies of a card.
pub async fn give_special_card(
    db: &DatabaseConnection,
    user_id: &str,
    card: &card::Model,
    quantity: i64,
) -> Result<()> {
    collection::add_units(db, user_id, CardRef::Card(card.id), true, quantity).await
}

/// Deterministic randomness for tests that roll dice.
#[must_use]
pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x7C6_B0D)
}
