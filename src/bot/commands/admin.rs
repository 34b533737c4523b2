//! Admin Discord commands - grants, card creation and resets.
//!
//! Only the user named by `ADMIN_USER_ID` may run these.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        config::admin,
        core::{
            catalog::{self, NewCard},
            collection::{self, mention},
            economy,
            reset::{self, ResetSummary},
        },
        entities::{Element, Rarity},
        errors::{Error, Rejection, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Card rarities an admin may create.
    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum RarityChoice {
        Common,
        Uncommon,
        Rare,
        Legendary,
        Deity,
    }

    impl From<RarityChoice> for Rarity {
        fn from(choice: RarityChoice) -> Self {
            match choice {
                RarityChoice::Common => Self::Common,
                RarityChoice::Uncommon => Self::Uncommon,
                RarityChoice::Rare => Self::Rare,
                RarityChoice::Legendary => Self::Legendary,
                RarityChoice::Deity => Self::Deity,
            }
        }
    }

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum ElementChoice {
        Blood,
        Mind,
        Time,
        Tech,
        Arcane,
        Necrotic,
        Deity,
    }

    impl From<ElementChoice> for Element {
        fn from(choice: ElementChoice) -> Self {
            match choice {
                ElementChoice::Blood => Self::Blood,
                ElementChoice::Mind => Self::Mind,
                ElementChoice::Time => Self::Time,
                ElementChoice::Tech => Self::Tech,
                ElementChoice::Arcane => Self::Arcane,
                ElementChoice::Necrotic => Self::Necrotic,
                ElementChoice::Deity => Self::Deity,
            }
        }
    }

    fn ensure_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        if admin::is_admin(&ctx.author().id.to_string()) {
            Ok(())
        } else {
            Err(Rejection::NotAuthorized.into())
        }
    }

    fn summary_text(summary: &ResetSummary) -> String {
        format!(
            "• Collection entries removed: {}\n\
             • Cards removed: {} (fused: {})\n\
             • Trades removed: {}\n\
             • Battles removed: {}\n\
             • Players reset: {}\n\
             • Cards regenerated: {}",
            summary.collection_entries,
            summary.cards_removed,
            summary.fused_cards_removed,
            summary.trades_removed,
            summary.battles_removed,
            summary.players_reset,
            summary.cards_seeded
        )
    }

    async fn reply_ephemeral(ctx: poise::Context<'_, BotData, Error>, content: String) -> Result<()> {
        ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Gives a player copies of a card.
    #[poise::command(slash_command)]
    pub async fn givecard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to receive the card"] user: serenity::User,
        #[description = "Card name"]
        #[autocomplete = "autocomplete::autocomplete_catalog_card"]
        card: String,
        #[description = "Number of copies (default 1)"] quantity: Option<i64>,
    ) -> Result<()> {
        ensure_admin(ctx)?;
        let quantity = quantity.unwrap_or(1);
        let user_id = user.id.to_string();
        let granted =
            collection::give_card(&ctx.data().database, &user_id, &card, quantity).await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "✅ Gave {} **{}** x{quantity}.",
                    mention(&user_id),
                    granted.name
                ))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Gives a player currency.
    #[poise::command(slash_command)]
    pub async fn givecurrency(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to receive the currency"] user: serenity::User,
        #[description = "Amount to give"] amount: i64,
    ) -> Result<()> {
        ensure_admin(ctx)?;
        let data = ctx.data();
        let user_id = user.id.to_string();
        let balance = economy::give_currency(
            &data.database,
            &user_id,
            amount,
            data.config.economy.default_credits,
        )
        .await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "✅ Gave {} **{amount}** {}. New balance: **{balance}**.",
                    mention(&user_id),
                    data.config.economy.currency_name
                ))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Adds a new card to the catalog.
    #[poise::command(slash_command)]
    #[allow(clippy::too_many_arguments)]
    pub async fn createcard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Unique card name"] name: String,
        #[description = "Flavour text"] description: String,
        #[description = "Rarity tier"] rarity: RarityChoice,
        #[description = "Base power"] power: i64,
        #[description = "Elemental type (Deity cards must be Deity)"] element: Option<
            ElementChoice,
        >,
        #[description = "Set label (default Base)"] set: Option<String>,
        #[description = "Image URL"] image_url: Option<String>,
    ) -> Result<()> {
        ensure_admin(ctx)?;
        let card = catalog::create_card(
            &ctx.data().database,
            NewCard {
                name,
                description,
                rarity: rarity.into(),
                element: element.map(Into::into),
                set_name: set.unwrap_or_else(|| "Base".to_string()),
                image_url,
                power,
            },
        )
        .await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "✅ Created {} **{}** ({}, power {}).",
                    card.rarity.emoji(),
                    card.name,
                    card.rarity,
                    card.power
                ))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Empties every collection and regenerates the catalog from the config.
    #[poise::command(slash_command)]
    pub async fn resetcollections(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Set to true to really wipe all collections"] confirm: bool,
    ) -> Result<()> {
        ensure_admin(ctx)?;
        if !confirm {
            return reply_ephemeral(
                ctx,
                "⚠️ This deletes every collection, fused card, trade and battle and \
                 regenerates the catalog. Run again with `confirm: True` to proceed."
                    .to_string(),
            )
            .await;
        }

        let data = ctx.data();
        let summary = reset::reset_collections(&data.database, &data.config.cards).await?;
        reply_ephemeral(
            ctx,
            format!("✅ Collections reset.\n{}", summary_text(&summary)),
        )
        .await
    }

    /// Resets the entire game, including player levels and balances.
    #[poise::command(slash_command)]
    pub async fn reset(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Set to true to really reset everything"] confirm: bool,
    ) -> Result<()> {
        ensure_admin(ctx)?;
        let data = ctx.data();
        let economy = &data.config.economy;
        if !confirm {
            return reply_ephemeral(
                ctx,
                format!(
                    "⚠️ This resets the ENTIRE game: collections, cards, trades and battles are \
                     deleted and every player returns to level 1 with {} {}. Run again with \
                     `confirm: True` to proceed.",
                    economy.default_credits, economy.currency_name
                ),
            )
            .await;
        }

        let summary =
            reset::reset_game(&data.database, &data.config.cards, economy.default_credits).await?;
        reply_ephemeral(ctx, format!("✅ System reset complete.\n{}", summary_text(&summary)))
            .await
    }
}

// Re-export all commands
pub use inner::*;
