//! Battle settlement - Moving card units and currency once a battle is decided.
//!
//! Settlement functions take a generic connection so the battle service can run
//! them inside the same transaction that records the outcome; either the battle
//! completes and its stakes change hands, or nothing happens at all.

use crate::{
    core::{
        catalog::CardRef,
        collection, economy,
        progress::{self, XpAward},
    },
    entities::{BattleModel, Side},
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use tracing::info;

/// Difficulty of a bot opponent, scaling the reward for beating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn reward_multiplier(self) -> f64 {
        match self {
            Self::Easy => 0.4,
            Self::Medium => 0.8,
            Self::Hard => 1.5,
        }
    }
}

/// Credits for beating a bot opponent: `floor(enemy power * difficulty multiplier)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn pve_reward(enemy_power: i64, difficulty: Difficulty) -> i64 {
    let reward = (enemy_power.max(0) as f64 * difficulty.reward_multiplier()).floor();
    if reward.is_finite() && reward > 0.0 {
        reward as i64
    } else {
        0
    }
}

/// What a player-versus-player settlement moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvpSettlement {
    pub winner_id: String,
    pub loser_id: String,
    pub card: CardRef,
    /// Whether the loser lost a special copy (the winner always receives a regular one)
    pub loser_special: bool,
    pub xp: XpAward,
}

/// Outcome of settling a battle against a bot opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PveSettlement {
    /// The player's card was destroyed
    CardLost,
    /// The player won credits
    Rewarded { credits: i64, balance: i64 },
    /// Neither side was knocked out
    Draw,
}

/// Moves one unit of the losing card from loser to winner and awards the winner XP.
///
/// The transferred unit is always credited as a regular copy, whatever the
/// loser's copy was. A tie settles nothing and returns `None`.
///
/// # Errors
/// Returns an error if the loser no longer holds the card or a write fails.
pub async fn settle_pvp<C>(
    db: &C,
    battle: &BattleModel,
    winner: Side,
    win_xp: i64,
    default_credits: i64,
) -> Result<Option<PvpSettlement>>
where
    C: ConnectionTrait,
{
    let (winner_id, loser_id, card, loser_special) = match winner {
        Side::Challenger => {
            let (Some(kind), Some(id)) = (battle.defender_card_kind, battle.defender_card_id)
            else {
                return Err(Error::Inconsistent {
                    message: format!("battle {} has no defender card bound", battle.id),
                });
            };
            (
                &battle.challenger_id,
                &battle.defender_id,
                CardRef::new(kind, id),
                battle.defender_special,
            )
        }
        Side::Defender => (
            &battle.defender_id,
            &battle.challenger_id,
            CardRef::new(battle.challenger_card_kind, battle.challenger_card_id),
            battle.challenger_special,
        ),
        Side::Tie => return Ok(None),
    };

    collection::remove_units(db, loser_id, card, loser_special, 1).await?;
    collection::add_units(db, winner_id, card, false, 1).await?;
    let xp = progress::add_xp(db, winner_id, win_xp, default_credits).await?;

    info!(battle_id = battle.id, winner_id, loser_id, %card, "Settled battle");
    Ok(Some(PvpSettlement {
        winner_id: winner_id.clone(),
        loser_id: loser_id.clone(),
        card,
        loser_special,
        xp,
    }))
}

/// Settles a battle against a bot opponent.
///
/// `outcome` is from the player's point of view: `Challenger` means the player
/// won. A loss destroys one unit of the player's card; a win pays
/// [`pve_reward`] credits.
#[allow(clippy::too_many_arguments)]
pub async fn settle_pve<C>(
    db: &C,
    user_id: &str,
    card: CardRef,
    special: bool,
    outcome: Side,
    enemy_power: i64,
    difficulty: Difficulty,
    default_credits: i64,
) -> Result<PveSettlement>
where
    C: ConnectionTrait,
{
    match outcome {
        Side::Defender => {
            collection::remove_units(db, user_id, card, special, 1).await?;
            info!(user_id, %card, "Card destroyed in bot battle");
            Ok(PveSettlement::CardLost)
        }
        Side::Challenger => {
            let credits = pve_reward(enemy_power, difficulty);
            let balance = if credits > 0 {
                economy::add_credits(db, user_id, credits, default_credits).await?
            } else {
                economy::balance(db, user_id, default_credits).await?
            };
            Ok(PveSettlement::Rewarded { credits, balance })
        }
        Side::Tie => Ok(PveSettlement::Draw),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{BattleStatus, CardKind, Rarity};
    use crate::test_utils::*;

    fn decided_battle(challenger_card: i64, defender_card: i64, defender_special: bool) -> BattleModel {
        BattleModel {
            id: 1,
            challenger_id: "alice".to_string(),
            defender_id: "bob".to_string(),
            challenger_card_kind: CardKind::Card,
            challenger_card_id: challenger_card,
            challenger_special: false,
            defender_card_kind: Some(CardKind::Card),
            defender_card_id: Some(defender_card),
            defender_special,
            status: BattleStatus::InProgress,
            challenger_wins: 0,
            defender_wins: 0,
            winner_id: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_pve_reward_floors() {
        assert_eq!(pve_reward(50, Difficulty::Easy), 20);
        assert_eq!(pve_reward(33, Difficulty::Medium), 26);
        assert_eq!(pve_reward(33, Difficulty::Hard), 49);
        assert_eq!(pve_reward(-5, Difficulty::Hard), 0);
    }

    #[tokio::test]
    async fn test_pvp_settlement_conserves_units_and_clears_special() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 1).await?;
        give_special_card(&db, "bob", &owl, 2).await?;
        let before = collection::total_units(&db, "alice").await? + collection::total_units(&db, "bob").await?;

        let battle = decided_battle(fox.id, owl.id, true);
        let settled = settle_pvp(&db, &battle, Side::Challenger, 15, 10)
            .await?
            .unwrap();
        assert_eq!(settled.winner_id, "alice");
        assert!(settled.loser_special);
        assert_eq!(settled.xp.gained, 15);

        let after = collection::total_units(&db, "alice").await? + collection::total_units(&db, "bob").await?;
        assert_eq!(before, after);
        assert_eq!(collection::quantity_of(&db, "bob", CardRef::Card(owl.id), true).await?, 1);
        assert_eq!(collection::quantity_of(&db, "alice", CardRef::Card(owl.id), false).await?, 1);
        assert_eq!(collection::quantity_of(&db, "alice", CardRef::Card(owl.id), true).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pvp_tie_moves_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let battle = decided_battle(1, 2, false);
        assert!(settle_pvp(&db, &battle, Side::Tie, 15, 10).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_pve_loss_destroys_one_unit() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        give_card(&db, "alice", &fox, 2).await?;

        let outcome = settle_pve(
            &db,
            "alice",
            CardRef::Card(fox.id),
            false,
            Side::Defender,
            80,
            Difficulty::Hard,
            10,
        )
        .await?;
        assert_eq!(outcome, PveSettlement::CardLost);
        assert_eq!(collection::total_units(&db, "alice").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_pve_win_pays_reward() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        give_card(&db, "alice", &fox, 1).await?;

        let outcome = settle_pve(
            &db,
            "alice",
            CardRef::Card(fox.id),
            false,
            Side::Challenger,
            80,
            Difficulty::Medium,
            10,
        )
        .await?;
        assert_eq!(
            outcome,
            PveSettlement::Rewarded {
                credits: 64,
                balance: 74
            }
        );
        assert_eq!(collection::total_units(&db, "alice").await?, 1);
        Ok(())
    }
}
