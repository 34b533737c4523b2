//! Economy business logic - Credit balances, periodic earnings and admin grants.
//!
//! Balances change through a single `credits = credits ± n` statement, and
//! spending is guarded in the same statement so a balance can never go negative.

use crate::{
    config::game::EconomyConfig,
    core::progress,
    entities::{Player, player},
    errors::{Rejection, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Result of a successful `/earn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Earnings {
    pub amount: i64,
    pub balance: i64,
}

/// Current credit balance of a player, registering them if needed.
pub async fn balance<C>(db: &C, user_id: &str, default_credits: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(progress::get_or_create_player(db, user_id, None, default_credits)
        .await?
        .credits)
}

/// Adds `amount` credits to a player's balance and returns the new balance.
///
/// # Errors
/// Returns `Rejection::NonPositiveAmount` if `amount` is not positive.
pub async fn add_credits<C>(db: &C, user_id: &str, amount: i64, default_credits: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Rejection::NonPositiveAmount.into());
    }
    progress::get_or_create_player(db, user_id, None, default_credits).await?;

    Player::update_many()
        .col_expr(
            player::Column::Credits,
            Expr::col(player::Column::Credits).add(amount),
        )
        .filter(player::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    balance(db, user_id, default_credits).await
}

/// Deducts `amount` credits if the player can afford it and returns the new balance.
///
/// # Errors
/// Returns `Rejection::InsufficientCredits` if the balance is too low.
pub async fn spend_credits<C>(db: &C, user_id: &str, amount: i64, default_credits: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Rejection::NonPositiveAmount.into());
    }
    let available = balance(db, user_id, default_credits).await?;

    let updated = Player::update_many()
        .col_expr(
            player::Column::Credits,
            Expr::col(player::Column::Credits).sub(amount),
        )
        .filter(player::Column::UserId.eq(user_id))
        .filter(player::Column::Credits.gte(amount))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Err(Rejection::InsufficientCredits {
            available,
            required: amount,
        }
        .into());
    }

    Ok(available - amount)
}

/// Minutes remaining until `last` plus `cooldown` has passed, rounded up.
#[must_use]
pub fn cooldown_minutes_left(last: DateTime<Utc>, cooldown: Duration, now: DateTime<Utc>) -> Option<i64> {
    let ready_at = last + cooldown;
    if now >= ready_at {
        return None;
    }
    let seconds = (ready_at - now).num_seconds();
    Some(((seconds + 59) / 60).max(1))
}

/// Claims periodic earnings: credits equal to the player's level, once per cooldown.
///
/// # Errors
/// Returns `Rejection::Cooldown` if the previous claim is too recent.
#[instrument(skip(db, config))]
pub async fn earn(
    db: &DatabaseConnection,
    user_id: &str,
    username: &str,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Earnings> {
    let txn = db.begin().await?;
    let player =
        progress::get_or_create_player(&txn, user_id, Some(username), config.default_credits)
            .await?;

    if let Some(last) = player.last_earn_at {
        let cooldown = Duration::hours(config.earn_cooldown_hours);
        if let Some(minutes_left) = cooldown_minutes_left(last, cooldown, now) {
            return Err(Rejection::Cooldown { minutes_left }.into());
        }
    }

    let amount = player.level.max(1);
    let balance = player.credits + amount;
    let mut active: player::ActiveModel = player.into();
    active.credits = Set(balance);
    active.last_earn_at = Set(Some(now));
    active.update(&txn).await?;
    txn.commit().await?;

    info!(user_id, amount, "Player earned credits");
    Ok(Earnings { amount, balance })
}

/// Admin grant of credits. Returns the recipient's new balance.
#[instrument(skip(db))]
pub async fn give_currency(
    db: &DatabaseConnection,
    user_id: &str,
    amount: i64,
    default_credits: i64,
) -> Result<i64> {
    add_credits(db, user_id, amount, default_credits).await
}
