//! Battle Discord commands - `battle`, `accept` and `fight`.
//!
//! Challenges and acceptances go through [`crate::core::battle`]; this module only
//! renders results and notifies the other player by direct message.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, notify_user, tasks},
        core::{
            battle::{self, BattleOutcome, BotFight},
            collection::mention,
            effects::describe_effects,
            resolver::MatchResult,
            settlement::{Difficulty, PveSettlement},
        },
        entities::Side,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BATTLE_COLOR: u32 = 0x00E7_4C3C;

    /// Bot opponent difficulty as offered in the slash command.
    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum DifficultyChoice {
        Easy,
        Medium,
        Hard,
    }

    impl From<DifficultyChoice> for Difficulty {
        fn from(choice: DifficultyChoice) -> Self {
            match choice {
                DifficultyChoice::Easy => Self::Easy,
                DifficultyChoice::Medium => Self::Medium,
                DifficultyChoice::Hard => Self::Hard,
            }
        }
    }

    fn round_fields(result: &MatchResult) -> Vec<(String, String, bool)> {
        if !result.turns.is_empty() {
            let last = result.turns.last();
            let summary = format!(
                "{} attacks, {} critical\nRemaining health: {} vs {}",
                result.turns.len(),
                result.turns.iter().filter(|turn| turn.critical).count(),
                last.map_or(0, |turn| turn.challenger_health),
                last.map_or(0, |turn| turn.defender_health),
            );
            return vec![("Duel".to_string(), summary, false)];
        }

        result
            .rounds
            .iter()
            .map(|round| {
                (
                    format!("Round {}", round.round_number),
                    format!(
                        "Challenger: **{}** ({})\nDefender: **{}** ({})\nWinner: {}",
                        round.challenger_power,
                        describe_effects(&round.challenger_effects),
                        round.defender_power,
                        describe_effects(&round.defender_effects),
                        round.winner,
                    ),
                    false,
                )
            })
            .collect()
    }

    fn outcome_text(outcome: &BattleOutcome, prefix: Option<&str>) -> String {
        let Some(settlement) = &outcome.settlement else {
            return "🤝 The battle ended in a draw. No cards change hands.".to_string();
        };
        let (lost_card, lost_special) = if outcome.result.winner == Side::Challenger {
            (&outcome.defender_card, outcome.battle.defender_special)
        } else {
            (&outcome.challenger_card, outcome.battle.challenger_special)
        };

        let mut text = format!(
            "🏆 {} wins {}-{} and takes **{}** from {}! (+{} XP)",
            mention(&settlement.winner_id),
            outcome.result.challenger_wins.max(outcome.result.defender_wins),
            outcome.result.challenger_wins.min(outcome.result.defender_wins),
            lost_card.display_name(lost_special, prefix),
            mention(&settlement.loser_id),
            settlement.xp.gained,
        );
        if settlement.xp.levels_gained > 0 {
            text.push_str(&format!("\n🎉 Level up! Now level {}.", settlement.xp.level));
        }
        text
    }

    fn fight_text(fight: &BotFight, prefix: Option<&str>, currency: &str) -> String {
        match fight.settlement {
            PveSettlement::CardLost => format!(
                "💀 Defeat! Your **{}** was destroyed.",
                fight.player_card.display_name(fight.player_special, prefix)
            ),
            PveSettlement::Rewarded { credits, balance } => format!(
                "🏆 Victory! You earned **{credits}** {currency}. Balance: **{balance}**."
            ),
            PveSettlement::Draw => "🤝 Neither side fell. It's a draw.".to_string(),
        }
    }

    /// Challenges another player to a best-of-three battle.
    ///
    /// The loser gives one copy of their card to the winner.
    #[poise::command(slash_command, prefix_command)]
    pub async fn battle(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to challenge"] opponent: serenity::User,
        #[description = "Card you fight with"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        card: String,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let now = Utc::now();
        tasks::expire_stale(db, tasks::ExpiryPolicy::from(&data.config), now).await?;

        if opponent.bot {
            ctx.say("❌ Bots don't accept challenges. Try `/fight` instead.")
                .await?;
            return Ok(());
        }

        let challenger_id = ctx.author().id.to_string();
        let defender_id = opponent.id.to_string();
        let (_, card_view) = battle::challenge(db, &challenger_id, &defender_id, &card, now).await?;

        ctx.say(format!(
            "⚔️ {} challenges {} with **{}**! Use `/accept <card>` to fight back.",
            mention(&challenger_id),
            mention(&defender_id),
            card_view.name
        ))
        .await?;
        notify_user(
            ctx,
            &defender_id,
            &format!(
                "⚔️ {} challenged you to a battle with **{}**! Use `/accept <card>` within {} minutes.",
                ctx.author().name,
                card_view.name,
                data.config.battle.pending_ttl_minutes
            ),
        )
        .await;
        Ok(())
    }

    /// Accepts your pending battle challenge and fights it out.
    #[poise::command(slash_command, prefix_command)]
    pub async fn accept(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Card you defend with"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        card: String,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let now = Utc::now();
        tasks::expire_stale(db, tasks::ExpiryPolicy::from(&data.config), now).await?;

        let defender_id = ctx.author().id.to_string();
        let mut rng = StdRng::from_os_rng();
        let outcome = battle::accept(db, &mut rng, &defender_id, &card, &data.config, now).await?;

        let prefix = data.config.economy.special_prefix.as_deref();
        let embed = serenity::CreateEmbed::default()
            .title("⚔️ Battle Results")
            .description(format!(
                "{}'s **{}** vs {}'s **{}**",
                mention(&outcome.battle.challenger_id),
                outcome
                    .challenger_card
                    .display_name(outcome.battle.challenger_special, prefix),
                mention(&outcome.battle.defender_id),
                outcome
                    .defender_card
                    .display_name(outcome.battle.defender_special, prefix),
            ))
            .color(BATTLE_COLOR)
            .fields(round_fields(&outcome.result))
            .field("Outcome", outcome_text(&outcome, prefix), false);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        notify_user(
            ctx,
            &outcome.battle.challenger_id,
            &format!(
                "⚔️ {} accepted your challenge.\n{}",
                ctx.author().name,
                outcome_text(&outcome, prefix)
            ),
        )
        .await;
        Ok(())
    }

    /// Fights a random bot opponent. Losing destroys your card.
    #[poise::command(slash_command, prefix_command)]
    pub async fn fight(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Card you fight with"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        card: String,
        #[description = "Opponent difficulty"] difficulty: DifficultyChoice,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let mut rng = StdRng::from_os_rng();
        let fight = battle::fight_bot(
            &data.database,
            &mut rng,
            &user_id,
            &card,
            difficulty.into(),
            &data.config,
        )
        .await?;

        let prefix = data.config.economy.special_prefix.as_deref();
        let embed = serenity::CreateEmbed::default()
            .title(format!("🤖 Bot Fight ({difficulty:?})"))
            .description(format!(
                "Your **{}** ({}) vs **{}** ({}, {})",
                fight.player_card.display_name(fight.player_special, prefix),
                fight.player_card.power,
                fight.enemy.name,
                fight.enemy.rarity,
                fight.enemy.power,
            ))
            .color(BATTLE_COLOR)
            .fields(round_fields(&fight.result))
            .field(
                "Outcome",
                fight_text(&fight, prefix, &data.config.economy.currency_name),
                false,
            );

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
