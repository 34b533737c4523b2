//! Autocomplete handlers for Discord slash command parameters.
//!
//! This module provides autocomplete functionality for card name parameters,
//! suggesting the cards a user owns or the whole catalog as the user types.

use crate::{
    bot::BotData,
    core::collection,
    entities::Card,
    errors::Error,
};
use sea_orm::EntityTrait;

/// Discord accepts at most 25 autocomplete choices.
const MAX_CHOICES: usize = 25;

fn matching_names(names: impl IntoIterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&partial_lower))
        .collect();
    matching.sort();
    matching.dedup();
    matching.truncate(MAX_CHOICES);
    matching
}

/// Provides autocomplete suggestions from the invoking user's collection.
///
/// Regular and special copies share a name, so each card is suggested once.
pub async fn autocomplete_owned_card(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let user_id = ctx.author().id.to_string();

    let Ok(owned) = collection::get_collection(db, &user_id).await else {
        return Vec::new();
    };
    matching_names(owned.into_iter().map(|owned| owned.card.name), partial)
}

/// Provides autocomplete suggestions from the regular card catalog.
pub async fn autocomplete_catalog_card(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(cards) = Card::find().all(db).await else {
        return Vec::new();
    };
    matching_names(cards.into_iter().map(|card| card.name), partial)
}
