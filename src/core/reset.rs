//! Admin resets - Wiping game state and regenerating the catalog from seeds.
//!
//! Battles and trades point at catalog cards, so every reset that clears the
//! catalog clears them too. Each reset runs in one transaction and either fully
//! applies or leaves the database untouched.

use crate::{
    config::game::CardSeed,
    core::catalog,
    entities::{
        Battle, BattleRound, Card, CollectionEntry, FusedCard, Player, Trade, TradeAttempt,
        TradeItem, player,
    },
    errors::Result,
};
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Row counts touched by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub collection_entries: u64,
    pub cards_removed: u64,
    pub fused_cards_removed: u64,
    pub trades_removed: u64,
    pub battles_removed: u64,
    /// Players whose progress and wallet went back to the starting values
    pub players_reset: u64,
    pub cards_seeded: usize,
}

async fn clear_cards(txn: &DatabaseTransaction, summary: &mut ResetSummary) -> Result<()> {
    BattleRound::delete_many().exec(txn).await?;
    summary.battles_removed = Battle::delete_many().exec(txn).await?.rows_affected;
    TradeItem::delete_many().exec(txn).await?;
    summary.trades_removed = Trade::delete_many().exec(txn).await?.rows_affected;
    summary.collection_entries = CollectionEntry::delete_many().exec(txn).await?.rows_affected;
    summary.fused_cards_removed = FusedCard::delete_many().exec(txn).await?.rows_affected;
    summary.cards_removed = Card::delete_many().exec(txn).await?.rows_affected;
    Ok(())
}

/// Empties every collection and regenerates the catalog from `seeds`.
///
/// Battles, trades and fused cards go with the catalog. Player progress and
/// wallets are kept.
#[instrument(skip(db, seeds))]
pub async fn reset_collections(db: &DatabaseConnection, seeds: &[CardSeed]) -> Result<ResetSummary> {
    let txn = db.begin().await?;
    let mut summary = ResetSummary::default();
    clear_cards(&txn, &mut summary).await?;
    summary.cards_seeded = catalog::seed_catalog(&txn, seeds).await?;
    txn.commit().await?;

    info!(?summary, "Collections reset");
    Ok(summary)
}

/// Resets the whole game: everything [`reset_collections`] does, plus every
/// player back to level 1 with `default_credits` and no earn cooldown, and the
/// trade rate-limit log cleared.
#[instrument(skip(db, seeds))]
pub async fn reset_game(
    db: &DatabaseConnection,
    seeds: &[CardSeed],
    default_credits: i64,
) -> Result<ResetSummary> {
    let txn = db.begin().await?;
    let mut summary = ResetSummary::default();
    clear_cards(&txn, &mut summary).await?;
    TradeAttempt::delete_many().exec(&txn).await?;
    summary.players_reset = Player::update_many()
        .col_expr(player::Column::Xp, Expr::value(0))
        .col_expr(player::Column::Level, Expr::value(1))
        .col_expr(player::Column::Credits, Expr::value(default_credits))
        .col_expr(player::Column::LastEarnAt, Expr::cust("NULL"))
        .exec(&txn)
        .await?
        .rows_affected;
    summary.cards_seeded = catalog::seed_catalog(&txn, seeds).await?;
    txn.commit().await?;

    info!(?summary, "Game reset");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::GameConfig;
    use crate::core::{battle, catalog::CardRef, collection, economy, progress};
    use crate::entities::Rarity;
    use crate::test_utils::*;
    use chrono::Utc;

    fn seeds() -> Vec<CardSeed> {
        toml::from_str::<GameConfig>(
            r#"
            [[cards]]
            name = "Ember Fox"
            description = "A fox"
            rarity = "common"
            power = 50

            [[cards]]
            name = "Rune Golem"
            description = "Carved, then woken"
            rarity = "uncommon"
            power = 75
            "#,
        )
        .unwrap()
        .cards
    }

    /// Two players with cards, one pending battle and some progress.
    async fn busy_game(db: &DatabaseConnection) -> Result<()> {
        let fox = create_test_card(db, "Ember Fox", Rarity::Common, 10).await?;
        let slime = create_test_card(db, "Slime", Rarity::Common, 5).await?;
        give_card(db, "alice", &fox, 3).await?;
        give_card(db, "bob", &slime, 2).await?;
        battle::challenge(db, "alice", "bob", "Ember Fox", Utc::now()).await?;
        economy::give_currency(db, "alice", 50, 10).await?;
        progress::add_xp(db, "alice", 500, 10).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_collections_keeps_players() -> Result<()> {
        let db = setup_test_db().await?;
        busy_game(&db).await?;

        let summary = reset_collections(&db, &seeds()).await?;
        assert_eq!(summary.collection_entries, 2);
        assert_eq!(summary.cards_removed, 2);
        assert_eq!(summary.battles_removed, 1);
        assert_eq!(summary.players_reset, 0);
        assert_eq!(summary.cards_seeded, 2);

        assert_eq!(collection::total_units(&db, "alice").await?, 0);
        assert!(battle::find_active_battle(&db, "alice").await?.is_none());
        assert!(catalog::get_card_by_name(&db, "Slime").await?.is_none());
        assert!(catalog::get_card_by_name(&db, "Rune Golem").await?.is_some());

        let alice = progress::get_or_create_player(&db, "alice", None, 10).await?;
        assert_eq!(alice.credits, 60);
        assert!(alice.level > 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_game_restores_starting_values() -> Result<()> {
        let db = setup_test_db().await?;
        busy_game(&db).await?;

        let summary = reset_game(&db, &seeds(), 25).await?;
        assert_eq!(summary.players_reset, 1);
        assert_eq!(summary.cards_seeded, 2);

        let alice = progress::get_or_create_player(&db, "alice", None, 10).await?;
        assert_eq!((alice.xp, alice.level, alice.credits), (0, 1, 25));
        assert!(alice.last_earn_at.is_none());
        assert!(TradeAttempt::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_reset_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        busy_game(&db).await?;
        let fox = catalog::get_card_by_name(&db, "Ember Fox").await?.unwrap();

        // Reseeding fails after everything has been deleted
        db.execute_unprepared(
            "CREATE TRIGGER fail_seed BEFORE INSERT ON cards \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        )
        .await?;

        assert!(reset_game(&db, &seeds(), 25).await.is_err());
        assert_eq!(
            collection::quantity_of(&db, "alice", CardRef::Card(fox.id), false).await?,
            3
        );
        assert!(battle::find_active_battle(&db, "bob").await?.is_some());
        let alice = progress::get_or_create_player(&db, "alice", None, 10).await?;
        assert_eq!(alice.credits, 60);
        Ok(())
    }
}
