//! Crafting - Trading cards up a rarity tier and fusing two cards into a new one.

use crate::{
    config::game::EconomyConfig,
    core::{
        catalog::{self, CardRef, CardView},
        collection, pack,
        progress::{self, XpAward},
    },
    entities::{card, fused_card},
    errors::{Error, Rejection, Result},
};
use rand::Rng;
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Copies consumed by one trade-up.
pub const TRADE_UP_COST: i64 = 5;
/// XP awarded for a trade-up.
pub const TRADE_UP_XP: i64 = 25;
/// Copies of each parent consumed by a fusion.
pub const FUSION_COST: i64 = 10;
/// Set label given to fused cards.
pub const FUSION_SET: &str = "Fusion";

/// Result of a trade-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeUp {
    pub consumed: CardView,
    pub received: card::Model,
    pub special: bool,
    pub xp: XpAward,
}

/// Merges two card names on their longest common trailing words.
///
/// `"Ember Fox"` and `"Frost Fox"` become `"Ember Frost Fox"`. Names with no
/// common ending are simply joined.
#[must_use]
pub fn fused_name(first: &str, second: &str) -> String {
    let first_words: Vec<&str> = first.split_whitespace().collect();
    let second_words: Vec<&str> = second.split_whitespace().collect();

    let shared = first_words
        .iter()
        .rev()
        .zip(second_words.iter().rev())
        .take_while(|(a, b)| a.to_lowercase() == b.to_lowercase())
        .count();

    if shared == 0 {
        return format!("{} {}", first_words.join(" "), second_words.join(" "));
    }

    let prefix = &first_words[..first_words.len() - shared];
    if prefix.is_empty() {
        second_words.join(" ")
    } else {
        format!("{} {}", prefix.join(" "), second_words.join(" "))
    }
}

/// Exchanges five regular copies of a card for one random card of the next rarity.
///
/// # Errors
/// Returns an error if:
/// - The user does not own a card by that name
/// - The card is fused, legendary or deity (no higher tier to trade into)
/// - Fewer than five regular copies are held
/// - The next tier has no cards in the catalog
#[instrument(skip(db, rng, config))]
pub async fn trade_up<R>(
    db: &DatabaseConnection,
    rng: &mut R,
    user_id: &str,
    username: &str,
    card_name: &str,
    config: &EconomyConfig,
) -> Result<TradeUp>
where
    R: Rng + Send + ?Sized,
{
    let txn = db.begin().await?;
    progress::get_or_create_player(&txn, user_id, Some(username), config.default_credits).await?;

    let owned = collection::find_owned_by_name(&txn, user_id, card_name)
        .await?
        .ok_or_else(|| Rejection::CardNotOwned {
            name: card_name.to_string(),
        })?;
    let consumed = owned.card;

    let next = match consumed.card_ref {
        CardRef::Card(_) => consumed.rarity.next_tier(),
        CardRef::Fused(_) => None,
    }
    .ok_or_else(|| Rejection::MaxRarity {
        name: consumed.rarity.to_string(),
    })?;

    collection::remove_units(&txn, user_id, consumed.card_ref, false, TRADE_UP_COST).await?;

    let received = catalog::random_card_of_rarity(&txn, rng, next).await?;
    let special = pack::roll_special(rng, config);
    collection::add_units(&txn, user_id, CardRef::Card(received.id), special, 1).await?;

    let xp = progress::add_xp(&txn, user_id, TRADE_UP_XP, config.default_credits).await?;
    txn.commit().await?;

    info!(user_id, from = %consumed.name, to = %received.name, "Traded up card");
    Ok(TradeUp {
        consumed,
        received,
        special,
        xp,
    })
}

/// Fuses ten regular copies of each of two catalog cards into a brand-new fused card.
///
/// The fused card's power is the sum of its parents' and the fuser receives one copy.
///
/// # Errors
/// Returns an error if:
/// - Either name is not a regular catalog card, or both name the same card
/// - Fewer than ten regular copies of either parent are held
#[instrument(skip(db))]
pub async fn fuse(
    db: &DatabaseConnection,
    user_id: &str,
    username: &str,
    first_name: &str,
    second_name: &str,
) -> Result<fused_card::Model> {
    let txn = db.begin().await?;

    let first = catalog::get_card_by_name(&txn, first_name)
        .await?
        .ok_or_else(|| Error::CardNotFound {
            name: first_name.to_string(),
        })?;
    let second = catalog::get_card_by_name(&txn, second_name)
        .await?
        .ok_or_else(|| Error::CardNotFound {
            name: second_name.to_string(),
        })?;
    if first.id == second.id {
        return Err(Rejection::InvalidCard {
            reason: "a card cannot be fused with itself".to_string(),
        }
        .into());
    }

    collection::remove_units(&txn, user_id, CardRef::Card(first.id), false, FUSION_COST).await?;
    collection::remove_units(&txn, user_id, CardRef::Card(second.id), false, FUSION_COST).await?;

    let fused = fused_card::ActiveModel {
        name: Set(fused_name(&first.name, &second.name)),
        description: Set(format!("A custom mutation by {username}")),
        set_name: Set(FUSION_SET.to_string()),
        image_url: Set(first.image_url.clone()),
        power: Set(first.power + second.power),
        fused_by: Set(user_id.to_string()),
        parent_a_id: Set(first.id),
        parent_b_id: Set(second.id),
        parent_quantity: Set(FUSION_COST),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let fused = fused.insert(&txn).await?;
    collection::add_units(&txn, user_id, CardRef::Fused(fused.id), false, 1).await?;
    txn.commit().await?;

    info!(user_id, fused_id = fused.id, name = %fused.name, "Fused cards");
    Ok(fused)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::Rarity;
    use crate::test_utils::*;

    #[test]
    fn test_fused_name_merges_common_ending() {
        assert_eq!(fused_name("Ember Fox", "Frost Fox"), "Ember Frost Fox");
        assert_eq!(fused_name("Slime", "Tide Oracle"), "Slime Tide Oracle");
        assert_eq!(fused_name("Fox", "Ember Fox"), "Ember Fox");
        assert_eq!(fused_name("Lord of Ash", "King of ASH"), "Lord King of ASH");
    }

    #[tokio::test]
    async fn test_trade_up_consumes_five_and_awards_xp() -> Result<()> {
        let db = setup_test_db().await?;
        let slime = create_test_card(&db, "Slime", Rarity::Common, 5).await?;
        create_test_card(&db, "Wolf", Rarity::Uncommon, 20).await?;
        give_card(&db, "alice", &slime, 6).await?;
        let mut rng = seeded_rng();

        let result = trade_up(&db, &mut rng, "alice", "Alice", "slime", &EconomyConfig::default()).await?;
        assert_eq!(result.received.name, "Wolf");
        assert_eq!(result.xp.gained, TRADE_UP_XP);
        assert_eq!(
            collection::quantity_of(&db, "alice", CardRef::Card(slime.id), false).await?,
            1
        );
        assert_eq!(collection::total_units(&db, "alice").await?, 2);

        let err = trade_up(&db, &mut rng, "alice", "Alice", "Slime", &EconomyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_rejection(),
            Some(Rejection::InsufficientQuantity { available: 1, requested: 5, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_legendary_cannot_trade_up() -> Result<()> {
        let db = setup_test_db().await?;
        let dragon = create_test_card(&db, "Dragon", Rarity::Legendary, 90).await?;
        give_card(&db, "alice", &dragon, 5).await?;
        let mut rng = seeded_rng();

        let err = trade_up(&db, &mut rng, "alice", "Alice", "Dragon", &EconomyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(Rejection::MaxRarity { .. })));
        assert_eq!(collection::total_units(&db, "alice").await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_trade_up_with_empty_next_tier_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let slime = create_test_card(&db, "Slime", Rarity::Common, 5).await?;
        give_card(&db, "alice", &slime, 5).await?;
        let mut rng = seeded_rng();

        let err = trade_up(&db, &mut rng, "alice", "Alice", "Slime", &EconomyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(Rejection::EmptyRarityPool { .. })));
        assert_eq!(collection::total_units(&db, "alice").await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_fuse_creates_card_with_summed_power() -> Result<()> {
        let db = setup_test_db().await?;
        let ember = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let frost = create_test_card(&db, "Frost Fox", Rarity::Rare, 70).await?;
        give_card(&db, "alice", &ember, 10).await?;
        give_card(&db, "alice", &frost, 12).await?;

        let fused = fuse(&db, "alice", "Alice", "Ember Fox", "frost fox").await?;
        assert_eq!(fused.name, "Ember Frost Fox");
        assert_eq!(fused.power, 120);
        assert_eq!(fused.set_name, FUSION_SET);

        let collection = collection::get_collection(&db, "alice").await?;
        let units: Vec<(String, i64)> = collection
            .iter()
            .map(|owned| (owned.card.name.clone(), owned.quantity()))
            .collect();
        assert_eq!(
            units,
            vec![
                ("Ember Frost Fox".to_string(), 1),
                ("Frost Fox".to_string(), 2)
            ]
        );
        assert_eq!(collection[0].card.rarity, Rarity::Fused);
        Ok(())
    }

    #[tokio::test]
    async fn test_fuse_requires_ten_of_each() -> Result<()> {
        let db = setup_test_db().await?;
        let ember = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let frost = create_test_card(&db, "Frost Fox", Rarity::Rare, 70).await?;
        give_card(&db, "alice", &ember, 10).await?;
        give_card(&db, "alice", &frost, 9).await?;

        let err = fuse(&db, "alice", "Alice", "Ember Fox", "Frost Fox")
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_rejection(),
            Some(Rejection::InsufficientQuantity { .. })
        ));
        // The first parent's copies were restored by the rollback
        assert_eq!(collection::total_units(&db, "alice").await?, 19);

        let same = fuse(&db, "alice", "Alice", "Ember Fox", "ember fox").await;
        assert!(same.is_err());
        Ok(())
    }
}
