//! Per-user sliding-window rate limiting for trade offers.
//!
//! Each user may make at most `max_attempts` offers within any `window`. The
//! limiter is an injected [`RateLimiter`] so the trade service does not care
//! where the attempt log lives:
//!
//! - [`MemoryRateLimiter`] keeps it in process memory (single bot instance only).
//! - [`DatabaseRateLimiter`] keeps it in the `trade_attempts` table, shared by every
//!   instance pointed at the same database.
//!
//! Both evaluate the window with [`evaluate`], so they behave identically.

use crate::{
    config::game::TradeConfig,
    entities::{TradeAttempt, trade_attempt},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

/// Where trade attempts are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitBackend {
    #[default]
    Memory,
    Database,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The attempt was allowed and recorded
    Allowed,
    /// The attempt was refused and not recorded
    Limited { seconds_left: u64 },
}

/// Size of the sliding window and how many attempts fit in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub window: Duration,
    pub max_attempts: usize,
}

impl From<&TradeConfig> for RateWindow {
    fn from(config: &TradeConfig) -> Self {
        Self {
            window: Duration::seconds(i64::try_from(config.rate_limit_window_secs).unwrap_or(i64::MAX)),
            max_attempts: config.max_offers_per_window,
        }
    }
}

impl RateWindow {
    /// Whether an attempt at `at` still counts at `now`.
    #[must_use]
    pub fn is_recent(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - at < self.window
    }
}

/// Decides whether one more attempt is allowed at `now`, given earlier attempts.
///
/// When refused, `seconds_left` is the time until the oldest recent attempt leaves
/// the window, rounded up to whole seconds.
#[must_use]
pub fn evaluate(window: &RateWindow, attempts: &[DateTime<Utc>], now: DateTime<Utc>) -> RateDecision {
    let mut recent: Vec<DateTime<Utc>> = attempts
        .iter()
        .copied()
        .filter(|at| window.is_recent(*at, now))
        .collect();
    if recent.len() < window.max_attempts {
        return RateDecision::Allowed;
    }

    recent.sort_unstable();
    let oldest = recent.first().copied().unwrap_or(now);
    let remaining_ms = (oldest + window.window - now).num_milliseconds().max(0);
    let seconds_left = u64::try_from((remaining_ms + 999) / 1000).unwrap_or(0).max(1);
    RateDecision::Limited { seconds_left }
}

/// Records attempts and decides whether a user may make another one.
pub trait RateLimiter: Send + Sync {
    /// Checks the window for `user_id` and, if allowed, records an attempt at `now`.
    fn check_and_record(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<RateDecision>> + Send;
}

/// Process-local attempt log.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    window: RateWindow,
    attempts: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl MemoryRateLimiter {
    #[must_use]
    pub fn new(window: RateWindow) -> Self {
        Self {
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, user_id: &str, now: DateTime<Utc>) -> RateDecision {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        // Users whose whole log has aged out are dropped from the map
        attempts.retain(|_, log| {
            log.retain(|at| self.window.is_recent(*at, now));
            !log.is_empty()
        });

        let log = attempts.entry(user_id.to_string()).or_default();
        let decision = evaluate(&self.window, log, now);
        if decision == RateDecision::Allowed {
            log.push(now);
        } else if log.is_empty() {
            attempts.remove(user_id);
        }
        decision
    }

    /// Number of users with attempts still inside the window.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RateLimiter for MemoryRateLimiter {
    async fn check_and_record(&self, user_id: &str, now: DateTime<Utc>) -> Result<RateDecision> {
        Ok(self.record(user_id, now))
    }
}

/// Attempt log in the `trade_attempts` table.
#[derive(Debug, Clone)]
pub struct DatabaseRateLimiter {
    db: DatabaseConnection,
    window: RateWindow,
}

impl DatabaseRateLimiter {
    #[must_use]
    pub const fn new(db: DatabaseConnection, window: RateWindow) -> Self {
        Self { db, window }
    }
}

impl RateLimiter for DatabaseRateLimiter {
    async fn check_and_record(&self, user_id: &str, now: DateTime<Utc>) -> Result<RateDecision> {
        let txn = self.db.begin().await?;
        let attempts = TradeAttempt::find()
            .filter(trade_attempt::Column::UserId.eq(user_id))
            .order_by_asc(trade_attempt::Column::AttemptedAt)
            .all(&txn)
            .await?;

        let (recent, stale): (Vec<_>, Vec<_>) = attempts
            .into_iter()
            .partition(|attempt| self.window.is_recent(attempt.attempted_at, now));
        if !stale.is_empty() {
            TradeAttempt::delete_many()
                .filter(trade_attempt::Column::Id.is_in(stale.iter().map(|a| a.id)))
                .exec(&txn)
                .await?;
        }

        let times: Vec<DateTime<Utc>> = recent.iter().map(|a| a.attempted_at).collect();
        let decision = evaluate(&self.window, &times, now);
        if decision == RateDecision::Allowed {
            trade_attempt::ActiveModel {
                user_id: Set(user_id.to_string()),
                attempted_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(decision)
    }
}

/// The limiter selected by `[trade] rate_limit_backend`.
#[derive(Debug)]
pub enum TradeRateLimiter {
    Memory(MemoryRateLimiter),
    Database(DatabaseRateLimiter),
}

impl TradeRateLimiter {
    #[must_use]
    pub fn from_config(config: &TradeConfig, db: &DatabaseConnection) -> Self {
        let window = RateWindow::from(config);
        match config.rate_limit_backend {
            RateLimitBackend::Memory => Self::Memory(MemoryRateLimiter::new(window)),
            RateLimitBackend::Database => {
                Self::Database(DatabaseRateLimiter::new(db.clone(), window))
            }
        }
    }
}

impl RateLimiter for TradeRateLimiter {
    async fn check_and_record(&self, user_id: &str, now: DateTime<Utc>) -> Result<RateDecision> {
        match self {
            Self::Memory(limiter) => limiter.check_and_record(user_id, now).await,
            Self::Database(limiter) => limiter.check_and_record(user_id, now).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn window() -> RateWindow {
        RateWindow {
            window: Duration::seconds(60),
            max_attempts: 3,
        }
    }

    #[test]
    fn test_evaluate_sliding_window() {
        let now = Utc::now();
        let attempts = [
            now - Duration::seconds(50),
            now - Duration::seconds(20),
            now - Duration::seconds(5),
        ];
        // Oldest attempt leaves the window in 10 seconds
        assert_eq!(
            evaluate(&window(), &attempts, now),
            RateDecision::Limited { seconds_left: 10 }
        );
        // Attempts at exactly the window length no longer count
        let aged = [now - Duration::seconds(60), attempts[1], attempts[2]];
        assert_eq!(evaluate(&window(), &aged, now), RateDecision::Allowed);
    }

    #[test]
    fn test_seconds_left_rounds_up() {
        let now = Utc::now();
        let attempts = [
            now - Duration::milliseconds(59_500),
            now - Duration::seconds(1),
            now,
        ];
        assert_eq!(
            evaluate(&window(), &attempts, now),
            RateDecision::Limited { seconds_left: 1 }
        );
    }

    async fn exercise_limiter<L: RateLimiter>(limiter: &L) -> Result<()> {
        let start = Utc::now();
        for offset in 0..3 {
            let decision = limiter
                .check_and_record("alice", start + Duration::seconds(offset))
                .await?;
            assert_eq!(decision, RateDecision::Allowed);
        }
        assert_eq!(
            limiter
                .check_and_record("alice", start + Duration::seconds(30))
                .await?,
            RateDecision::Limited { seconds_left: 30 }
        );
        // Other users are unaffected
        assert_eq!(
            limiter.check_and_record("bob", start).await?,
            RateDecision::Allowed
        );
        // Once the first attempt ages out, one more fits
        assert_eq!(
            limiter
                .check_and_record("alice", start + Duration::seconds(60))
                .await?,
            RateDecision::Allowed
        );
        assert!(matches!(
            limiter
                .check_and_record("alice", start + Duration::seconds(60))
                .await?,
            RateDecision::Limited { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_limiter() -> Result<()> {
        exercise_limiter(&MemoryRateLimiter::new(window())).await
    }

    #[tokio::test]
    async fn test_memory_limiter_forgets_idle_users() -> Result<()> {
        let limiter = MemoryRateLimiter::new(window());
        let start = Utc::now();
        limiter.check_and_record("alice", start).await?;
        limiter.check_and_record("bob", start).await?;
        assert_eq!(limiter.tracked_users(), 2);

        // Both logs have aged out by the time carol shows up
        limiter
            .check_and_record("carol", start + Duration::seconds(61))
            .await?;
        assert_eq!(limiter.tracked_users(), 1);

        let refusing = MemoryRateLimiter::new(RateWindow {
            window: Duration::seconds(60),
            max_attempts: 0,
        });
        assert!(matches!(
            refusing.check_and_record("alice", start).await?,
            RateDecision::Limited { .. }
        ));
        assert_eq!(refusing.tracked_users(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_database_limiter() -> Result<()> {
        let db = setup_test_db().await?;
        exercise_limiter(&DatabaseRateLimiter::new(db.clone(), window())).await?;
        // Refused attempts are not recorded
        assert!(TradeAttempt::find().all(&db).await?.len() <= 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_backend_selected_from_config() -> Result<()> {
        let db = setup_test_db().await?;
        let config = TradeConfig {
            rate_limit_backend: RateLimitBackend::Database,
            ..TradeConfig::default()
        };
        let limiter = TradeRateLimiter::from_config(&config, &db);
        assert!(matches!(limiter, TradeRateLimiter::Database(_)));
        exercise_limiter(&limiter).await
    }
}
