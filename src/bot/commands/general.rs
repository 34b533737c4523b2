//! General Discord commands - ping, help, profile and earn.
//! This module contains simple player-facing commands that show progress and
//! provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{collection, economy, progress},
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**TcgBuddy Help**\n\
        Here is a summary of all available commands.\n\n\
        **Cards**\n\
        • `/open` - Buys and opens a card pack.\n\
        • `/collection [user] [rarity] [set]` - Shows a card collection, optionally filtered.\n\
        • `/inspect <card>` - Shows one of your cards in detail.\n\
        • `/tradeup <card>` - Trades 5 copies for a card of the next rarity.\n\
        • `/fuse <first> <second>` - Fuses 10 copies of each into a new card.\n\n\
        **Battles**\n\
        • `/battle <user> <card>` - Challenges a player; the loser gives up their card.\n\
        • `/accept <card>` - Accepts your pending challenge.\n\
        • `/fight <card> <difficulty>` - Fights a bot for credits; losing destroys your card.\n\n\
        **Trading**\n\
        • `/trade offer <user> <offer> <request>` - Offers cards, e.g. `Ember Fox x2, Ash Owl`.\n\
        • `/trade accept <id>` / `/trade cancel <id>` / `/trade list`\n\n\
        **Progress**\n\
        • `/profile [user]` - Shows level, XP and balance.\n\
        • `/earn` - Claims credits equal to your level.\n\
        • `/ping` - Checks if the bot is responsive.";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows a player's level, XP, balance and collection size.
    #[poise::command(slash_command, prefix_command)]
    pub async fn profile(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Whose profile to show"] user: Option<serenity::User>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let target_id = target.id.to_string();

        let player = progress::get_or_create_player(
            db,
            &target_id,
            Some(&target.name),
            data.config.economy.default_credits,
        )
        .await?;
        let cards = collection::total_units(db, &target_id).await?;

        let embed = serenity::CreateEmbed::default()
            .title(format!("👤 {}", target.name))
            .color(0x0058_65F2) // Discord purple
            .field("Level", player.level.to_string(), true)
            .field(
                "XP",
                format!(
                    "{}/{}",
                    player.xp,
                    progress::xp_for_next_level(player.level)
                ),
                true,
            )
            .field(
                "Balance",
                format!("{} {}", player.credits, data.config.economy.currency_name),
                true,
            )
            .field("Cards", cards.to_string(), true);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Claims periodic credits equal to your level.
    #[poise::command(slash_command, prefix_command)]
    pub async fn earn(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let economy_config = &data.config.economy;
        let user_id = ctx.author().id.to_string();

        let earnings = economy::earn(
            &data.database,
            &user_id,
            &ctx.author().name,
            economy_config,
            Utc::now(),
        )
        .await?;

        ctx.say(format!(
            "💰 You earned **{}** {}! Balance: **{}**. Come back in {} hours.",
            earnings.amount,
            economy_config.currency_name,
            earnings.balance,
            economy_config.earn_cooldown_hours
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
