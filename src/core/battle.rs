//! Battle state machine - Challenges, acceptance and bot fights.
//!
//! A battle moves `pending -> in_progress -> completed`, or `pending -> cancelled`
//! when it is never accepted. Acceptance resolves the whole match synchronously:
//! binding the defender's card, playing every round, recording the rounds,
//! completing the battle and settling the stakes all happen in one database
//! transaction, so a failure at any step leaves the battle pending and every
//! collection untouched.
//!
//! A user takes part in at most one non-terminal battle at a time.

use crate::{
    config::GameConfig,
    core::{
        catalog::{self, CardRef, CardView},
        collection,
        effects::format_effects,
        resolver::{self, HealthPoolRules, MatchResult},
        settlement::{self, Difficulty, PveSettlement, PvpSettlement},
    },
    entities::{
        Battle, BattleRound, BattleStatus, Card, Rarity, Side, battle, battle_round,
    },
    errors::{Rejection, Result},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// A resolved player-versus-player battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleOutcome {
    pub battle: battle::Model,
    pub challenger_card: CardView,
    pub defender_card: CardView,
    pub result: MatchResult,
    pub settlement: Option<PvpSettlement>,
}

/// A resolved fight against a bot opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotFight {
    pub player_card: CardView,
    pub player_special: bool,
    pub enemy: CardView,
    pub difficulty: Difficulty,
    pub result: MatchResult,
    pub settlement: PveSettlement,
}

fn non_terminal() -> Condition {
    Condition::any()
        .add(battle::Column::Status.eq(BattleStatus::Pending))
        .add(battle::Column::Status.eq(BattleStatus::InProgress))
}

/// The pending or in-progress battle a user takes part in, if any.
pub async fn find_active_battle<C>(db: &C, user_id: &str) -> Result<Option<battle::Model>>
where
    C: ConnectionTrait,
{
    Battle::find()
        .filter(non_terminal())
        .filter(
            Condition::any()
                .add(battle::Column::ChallengerId.eq(user_id))
                .add(battle::Column::DefenderId.eq(user_id)),
        )
        .one(db)
        .await
        .map_err(Into::into)
}

/// Challenges `defender_id` to a battle with the challenger's card named `card_name`.
///
/// # Errors
/// Returns a rejection if:
/// - The challenger targets themself
/// - Either player already has a pending or in-progress battle
/// - The challenger does not own the card
/// - The defender owns no cards at all
#[instrument(skip(db))]
pub async fn challenge(
    db: &DatabaseConnection,
    challenger_id: &str,
    defender_id: &str,
    card_name: &str,
    now: DateTime<Utc>,
) -> Result<(battle::Model, CardView)> {
    if challenger_id == defender_id {
        return Err(Rejection::SelfTarget.into());
    }

    let txn = db.begin().await?;
    if find_active_battle(&txn, challenger_id).await?.is_some()
        || find_active_battle(&txn, defender_id).await?.is_some()
    {
        return Err(Rejection::AlreadyInBattle.into());
    }

    let owned = collection::find_owned_by_name(&txn, challenger_id, card_name)
        .await?
        .ok_or_else(|| Rejection::CardNotOwned {
            name: card_name.to_string(),
        })?;
    if collection::total_units(&txn, defender_id).await? == 0 {
        return Err(Rejection::EmptyCollection {
            user: collection::mention(defender_id),
        }
        .into());
    }

    let battle = battle::ActiveModel {
        challenger_id: Set(challenger_id.to_string()),
        defender_id: Set(defender_id.to_string()),
        challenger_card_kind: Set(owned.card_ref().kind()),
        challenger_card_id: Set(owned.card_ref().id()),
        challenger_special: Set(owned.special()),
        defender_card_kind: Set(None),
        defender_card_id: Set(None),
        defender_special: Set(false),
        status: Set(BattleStatus::Pending),
        challenger_wins: Set(0),
        defender_wins: Set(0),
        winner_id: Set(None),
        created_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(battle_id = battle.id, challenger_id, defender_id, "Battle challenge created");
    Ok((battle, owned.card))
}

/// Accepts the pending challenge addressed to `defender_id` and resolves it.
///
/// # Errors
/// Returns a rejection if:
/// - The defender has no pending challenge
/// - The defender does not own the card
/// - The challenger no longer holds their card (the battle is cancelled)
#[instrument(skip(db, rng, config))]
pub async fn accept<R>(
    db: &DatabaseConnection,
    rng: &mut R,
    defender_id: &str,
    card_name: &str,
    config: &GameConfig,
    now: DateTime<Utc>,
) -> Result<BattleOutcome>
where
    R: Rng + Send + ?Sized,
{
    let txn = db.begin().await?;
    let pending = Battle::find()
        .filter(battle::Column::DefenderId.eq(defender_id))
        .filter(battle::Column::Status.eq(BattleStatus::Pending))
        .order_by_asc(battle::Column::CreatedAt)
        .one(&txn)
        .await?
        .ok_or(Rejection::NoPendingBattle)?;

    let defender = collection::find_owned_by_name(&txn, defender_id, card_name)
        .await?
        .ok_or_else(|| Rejection::CardNotOwned {
            name: card_name.to_string(),
        })?;

    let challenger_ref = CardRef::new(pending.challenger_card_kind, pending.challenger_card_id);
    let still_held = collection::quantity_of(
        &txn,
        &pending.challenger_id,
        challenger_ref,
        pending.challenger_special,
    )
    .await?;
    if still_held == 0 {
        let mut cancelled: battle::ActiveModel = pending.into();
        cancelled.status = Set(BattleStatus::Cancelled);
        cancelled.completed_at = Set(Some(now));
        cancelled.update(&txn).await?;
        txn.commit().await?;
        warn!(defender_id, "Battle cancelled: challenger card no longer held");
        return Err(Rejection::ChallengerCardGone.into());
    }
    let challenger_card = catalog::require(&txn, challenger_ref).await?;

    let mut active: battle::ActiveModel = pending.into();
    active.defender_card_kind = Set(Some(defender.card_ref().kind()));
    active.defender_card_id = Set(Some(defender.card_ref().id()));
    active.defender_special = Set(defender.special());
    active.status = Set(BattleStatus::InProgress);
    let in_progress = active.update(&txn).await?;

    let result = resolver::resolve_match(
        rng,
        &challenger_card.combatant(in_progress.challenger_special),
        &defender.card.combatant(defender.special()),
        &config.battle,
    );

    for round in &result.rounds {
        battle_round::ActiveModel {
            battle_id: Set(in_progress.id),
            round_number: Set(round.round_number),
            challenger_power: Set(round.challenger_power),
            defender_power: Set(round.defender_power),
            challenger_effects: Set(format_effects(&round.challenger_effects)),
            defender_effects: Set(format_effects(&round.defender_effects)),
            winner: Set(round.winner),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let winner_id = match result.winner {
        Side::Challenger => Some(in_progress.challenger_id.clone()),
        Side::Defender => Some(in_progress.defender_id.clone()),
        Side::Tie => None,
    };
    let mut finished: battle::ActiveModel = in_progress.into();
    finished.status = Set(BattleStatus::Completed);
    finished.challenger_wins = Set(result.challenger_wins);
    finished.defender_wins = Set(result.defender_wins);
    finished.winner_id = Set(winner_id);
    finished.completed_at = Set(Some(now));
    let completed = finished.update(&txn).await?;

    let settlement = settlement::settle_pvp(
        &txn,
        &completed,
        result.winner,
        config.battle.win_xp,
        config.economy.default_credits,
    )
    .await?;
    txn.commit().await?;

    info!(
        battle_id = completed.id,
        winner = %result.winner,
        rounds = result.rounds.len(),
        "Battle completed"
    );
    Ok(BattleOutcome {
        battle: completed,
        challenger_card,
        defender_card: defender.card,
        result,
        settlement,
    })
}

/// Recorded rounds of a battle in order.
pub async fn get_rounds(db: &DatabaseConnection, battle_id: i64) -> Result<Vec<battle_round::Model>> {
    BattleRound::find()
        .filter(battle_round::Column::BattleId.eq(battle_id))
        .order_by_asc(battle_round::Column::RoundNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cancels every pending battle created more than `ttl` before `now`.
///
/// Returns the number of battles expired.
pub async fn expire_stale_battles(db: &DatabaseConnection, ttl: Duration, now: DateTime<Utc>) -> Result<u64> {
    let pending = Battle::find()
        .filter(battle::Column::Status.eq(BattleStatus::Pending))
        .all(db)
        .await?;

    let mut expired = 0;
    for stale in pending.into_iter().filter(|b| b.created_at + ttl <= now) {
        let result = Battle::update_many()
            .col_expr(battle::Column::Status, Expr::value(BattleStatus::Cancelled))
            .col_expr(battle::Column::CompletedAt, Expr::value(Some(now)))
            .filter(battle::Column::Id.eq(stale.id))
            .filter(battle::Column::Status.eq(BattleStatus::Pending))
            .exec(db)
            .await?;
        expired += result.rows_affected;
    }
    if expired > 0 {
        info!(expired, "Expired stale battle challenges");
    }
    Ok(expired)
}

/// Rarity of the opponent drawn for each difficulty.
#[must_use]
pub const fn enemy_rarity(difficulty: Difficulty) -> Rarity {
    match difficulty {
        Difficulty::Easy => Rarity::Common,
        Difficulty::Medium => Rarity::Rare,
        Difficulty::Hard => Rarity::Legendary,
    }
}

/// Fights a random catalog card controlled by the bot.
///
/// Bot fights always use the health-pool rules. Losing destroys one copy of the
/// player's card; winning pays credits scaled by difficulty; a draw changes nothing.
///
/// # Errors
/// Returns a rejection if the player does not own the card or the catalog is empty.
#[instrument(skip(db, rng, config))]
pub async fn fight_bot<R>(
    db: &DatabaseConnection,
    rng: &mut R,
    user_id: &str,
    card_name: &str,
    difficulty: Difficulty,
    config: &GameConfig,
) -> Result<BotFight>
where
    R: Rng + Send + ?Sized,
{
    let txn = db.begin().await?;
    let owned = collection::find_owned_by_name(&txn, user_id, card_name)
        .await?
        .ok_or_else(|| Rejection::CardNotOwned {
            name: card_name.to_string(),
        })?;

    let rarity = enemy_rarity(difficulty);
    let mut pool = catalog::cards_of_rarity(&txn, rarity).await?;
    if pool.is_empty() {
        pool = Card::find().all(&txn).await?;
    }
    let enemy: CardView = pool
        .choose(rng)
        .cloned()
        .ok_or_else(|| Rejection::EmptyRarityPool {
            rarity: rarity.to_string(),
        })?
        .into();

    let special = owned.special();
    let result = resolver::health_pool_duel(
        rng,
        &owned.card.combatant(special),
        &enemy.combatant(false),
        &HealthPoolRules::from(&config.battle),
    );

    let settlement = settlement::settle_pve(
        &txn,
        user_id,
        owned.card_ref(),
        special,
        result.winner,
        enemy.power,
        difficulty,
        config.economy.default_credits,
    )
    .await?;
    txn.commit().await?;

    info!(user_id, enemy = %enemy.name, winner = %result.winner, "Bot fight finished");
    Ok(BotFight {
        player_card: owned.card,
        player_special: special,
        enemy,
        difficulty,
        result,
        settlement,
    })
}
