//! Player progress - Registration, experience and levels.
//!
//! The XP needed to clear a level grows exponentially: `floor(50 * 1.15^(level - 1))`.
//! XP beyond the threshold carries over, so one large award can cascade through
//! several levels.

use crate::{
    entities::{Player, player},
    errors::Result,
};
use sea_orm::{Set, prelude::*};
use tracing::info;

const BASE_XP: f64 = 50.0;
const XP_GROWTH: f64 = 1.15;

/// XP required to advance from `level` to `level + 1`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn xp_for_next_level(level: i64) -> i64 {
    let exponent = i32::try_from(level.saturating_sub(1).max(0)).unwrap_or(i32::MAX);
    let needed = (BASE_XP * XP_GROWTH.powi(exponent)).floor();
    if needed.is_finite() && needed < i64::MAX as f64 {
        (needed as i64).max(1)
    } else {
        i64::MAX
    }
}

/// Result of granting XP to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    pub gained: i64,
    pub xp: i64,
    pub level: i64,
    pub levels_gained: i64,
    /// XP needed to clear the new current level
    pub xp_for_next_level: i64,
}

/// Applies an XP award to an `(xp, level)` pair without touching the database.
///
/// Non-positive awards leave the state unchanged.
#[must_use]
pub fn apply_xp(xp: i64, level: i64, award: i64) -> XpAward {
    let gained = award.max(0);
    let mut xp = xp.max(0).saturating_add(gained);
    let mut level = level.max(1);
    let starting_level = level;

    loop {
        let needed = xp_for_next_level(level);
        if xp < needed {
            break;
        }
        xp -= needed;
        level += 1;
    }

    XpAward {
        gained,
        xp,
        level,
        levels_gained: level - starting_level,
        xp_for_next_level: xp_for_next_level(level),
    }
}

/// Loads a player, registering them with `default_credits` on first contact.
///
/// When `username` is given and differs from the stored one, it is refreshed.
pub async fn get_or_create_player<C>(
    db: &C,
    user_id: &str,
    username: Option<&str>,
    default_credits: i64,
) -> Result<player::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = Player::find_by_id(user_id.to_string()).one(db).await? {
        return match username {
            Some(name) if name != existing.username => {
                let mut active: player::ActiveModel = existing.into();
                active.username = Set(name.to_string());
                active.update(db).await.map_err(Into::into)
            }
            _ => Ok(existing),
        };
    }

    let player = player::ActiveModel {
        user_id: Set(user_id.to_string()),
        username: Set(username.unwrap_or(user_id).to_string()),
        xp: Set(0),
        level: Set(1),
        credits: Set(default_credits),
        last_earn_at: Set(None),
    };
    let player = player.insert(db).await?;
    info!(user_id, "Registered new player");
    Ok(player)
}

/// Grants XP to a player (registering them if needed) and persists any level-ups.
pub async fn add_xp<C>(db: &C, user_id: &str, amount: i64, default_credits: i64) -> Result<XpAward>
where
    C: ConnectionTrait,
{
    let player = get_or_create_player(db, user_id, None, default_credits).await?;
    let award = apply_xp(player.xp, player.level, amount);

    let mut active: player::ActiveModel = player.into();
    active.xp = Set(award.xp);
    active.level = Set(award.level);
    active.update(db).await?;

    if award.levels_gained > 0 {
        info!(user_id, level = award.level, "Player levelled up");
    }
    Ok(award)
}
