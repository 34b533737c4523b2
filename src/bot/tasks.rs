//! Background maintenance - expiring stale battle challenges and trade offers.
//!
//! Expiry also runs lazily at the start of every battle and trade command, so
//! the periodic sweep only has to catch offers nobody touches again.

use crate::{
    config::GameConfig,
    core::{battle, trade},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::{debug, error, info};

/// How often the background sweep runs.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Lifetimes of pending battles and trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub battle_ttl: Duration,
    pub trade_ttl: Duration,
}

impl From<&GameConfig> for ExpiryPolicy {
    fn from(config: &GameConfig) -> Self {
        Self {
            battle_ttl: Duration::minutes(config.battle.pending_ttl_minutes),
            trade_ttl: Duration::hours(config.trade.pending_ttl_hours),
        }
    }
}

/// Number of records cancelled by one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expired {
    pub battles: u64,
    pub trades: u64,
}

/// Cancels every pending battle and trade older than its lifetime.
pub async fn expire_stale(
    db: &DatabaseConnection,
    policy: ExpiryPolicy,
    now: DateTime<Utc>,
) -> Result<Expired> {
    let battles = battle::expire_stale_battles(db, policy.battle_ttl, now).await?;
    let trades = trade::expire_stale_trades(db, policy.trade_ttl, now).await?;
    Ok(Expired { battles, trades })
}

/// Spawns the periodic expiry sweep on the tokio runtime.
pub fn spawn_expiry_task(
    database: DatabaseConnection,
    policy: ExpiryPolicy,
) -> tokio::task::JoinHandle<()> {
    info!(?policy, "Starting expiry sweep every {}s", SWEEP_INTERVAL.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match expire_stale(&database, policy, Utc::now()).await {
                Ok(expired) => debug!(?expired, "Expiry sweep finished"),
                Err(e) => error!("Expiry sweep failed: {e}"),
            }
        }
    })
}
