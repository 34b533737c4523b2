//! Booster packs.
//!
//! A pack holds three distinct commons, one uncommon and one rare; the rare slot
//! is upgraded to a legendary with `legendary_chance`. Each pulled card may be a
//! special copy when special cards are enabled.

use crate::{
    config::game::EconomyConfig,
    core::{
        catalog::{self, CardRef},
        collection, economy, progress,
    },
    entities::{Rarity, card},
    errors::{Rejection, Result},
};
use rand::Rng;
use rand::seq::IndexedRandom;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};

const COMMONS_PER_PACK: usize = 3;

/// One card pulled from a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledCard {
    pub card: card::Model,
    pub special: bool,
}

/// Result of opening a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOpening {
    pub cards: Vec<PulledCard>,
    pub balance: i64,
}

/// Rolls whether a freshly produced card is a special copy.
pub fn roll_special<R>(rng: &mut R, config: &EconomyConfig) -> bool
where
    R: Rng + ?Sized,
{
    config.can_generate_special_cards() && rng.random_bool(config.special_chance.clamp(0.0, 1.0))
}

/// Pays for and opens one pack, adding every pulled card to the player's collection.
///
/// # Errors
/// Returns an error if:
/// - The player cannot afford the pack
/// - The catalog has no common, uncommon or rare cards
/// - The database transaction fails
#[instrument(skip(db, rng, config))]
pub async fn open_pack<R>(
    db: &DatabaseConnection,
    rng: &mut R,
    user_id: &str,
    username: &str,
    config: &EconomyConfig,
) -> Result<PackOpening>
where
    R: Rng + Send + ?Sized,
{
    let txn = db.begin().await?;
    progress::get_or_create_player(&txn, user_id, Some(username), config.default_credits).await?;
    let balance =
        economy::spend_credits(&txn, user_id, config.pack_cost, config.default_credits).await?;

    let commons = catalog::cards_of_rarity(&txn, Rarity::Common).await?;
    if commons.is_empty() {
        return Err(Rejection::EmptyRarityPool {
            rarity: Rarity::Common.to_string(),
        }
        .into());
    }
    let mut pulled: Vec<card::Model> = commons
        .choose_multiple(rng, COMMONS_PER_PACK)
        .cloned()
        .collect();

    pulled.push(catalog::random_card_of_rarity(&txn, rng, Rarity::Uncommon).await?);

    let top = if rng.random_bool(config.legendary_chance.clamp(0.0, 1.0)) {
        let legendaries = catalog::cards_of_rarity(&txn, Rarity::Legendary).await?;
        match legendaries.choose(rng) {
            Some(card) => card.clone(),
            None => catalog::random_card_of_rarity(&txn, rng, Rarity::Rare).await?,
        }
    } else {
        catalog::random_card_of_rarity(&txn, rng, Rarity::Rare).await?
    };
    pulled.push(top);

    let mut cards = Vec::with_capacity(pulled.len());
    for card in pulled {
        let special = roll_special(rng, config);
        collection::add_units(&txn, user_id, CardRef::Card(card.id), special, 1).await?;
        cards.push(PulledCard { card, special });
    }

    txn.commit().await?;
    info!(user_id, cards = cards.len(), "Opened pack");
    Ok(PackOpening { cards, balance })
}
