//! Trade Discord commands - `trade offer`, `trade accept`, `trade cancel` and `trade list`.
//!
//! Card lists are typed as comma-separated names with optional quantities,
//! e.g. `Ember Fox x2, Ash Owl`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, notify_user, tasks},
        core::{
            collection::mention,
            trade::{self, TradeDetails, TradeLine, TradeRequest},
        },
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;

    const TRADE_COLOR: u32 = 0x002E_CC71;
    /// Discord allows at most ten embeds per message.
    const MAX_EMBEDS: usize = 10;

    fn describe_lines(lines: &[TradeLine]) -> String {
        lines
            .iter()
            .map(|line| format!("• {} x{}", line.card.name, line.quantity))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn trade_embed(title: &str, details: &TradeDetails) -> serenity::CreateEmbed {
        serenity::CreateEmbed::default()
            .title(title)
            .description(format!(
                "{} ➜ {}",
                mention(&details.trade.initiator_id),
                mention(&details.trade.target_id)
            ))
            .color(TRADE_COLOR)
            .field("Offered", describe_lines(&details.offered), true)
            .field("Requested", describe_lines(&details.requested), true)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Trade ID: {}",
                details.trade.id
            )))
    }

    /// Parent command for card-for-card trades with other players.
    #[poise::command(
        slash_command,
        subcommands("trade_offer", "trade_accept", "trade_cancel", "trade_list")
    )]
    pub async fn trade(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Trade command. Available subcommands:\n\
            `/trade offer` - Offer cards for someone else's cards\n\
            `/trade accept` - Accept a trade offered to you\n\
            `/trade cancel` - Cancel a trade you are part of\n\
            `/trade list` - Show your pending trades";

        ctx.send(
            poise::CreateReply::default()
                .content(help_text)
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Offers some of your cards in exchange for some of another player's cards.
    #[poise::command(slash_command, rename = "offer")]
    pub async fn trade_offer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to trade with"] target: serenity::User,
        #[description = "Cards you give, e.g. 'Ember Fox x2, Ash Owl'"] offer: String,
        #[description = "Cards you want in return"] request: String,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let now = Utc::now();
        tasks::expire_stale(db, tasks::ExpiryPolicy::from(&data.config), now).await?;

        let initiator_id = ctx.author().id.to_string();
        let target_id = target.id.to_string();
        let details = trade::offer_trade(
            db,
            &data.rate_limiter,
            &data.config.trade,
            TradeRequest {
                initiator_id: &initiator_id,
                target_id: &target_id,
                offered: &offer,
                requested: &request,
            },
            now,
        )
        .await?;

        ctx.send(poise::CreateReply::default().embed(trade_embed("🤝 Trade Offer", &details)))
            .await?;
        notify_user(
            ctx,
            &target_id,
            &format!(
                "🤝 {} offered you a trade. Use `/trade accept {}` to accept or `/trade cancel {}` to decline.",
                ctx.author().name,
                details.trade.id,
                details.trade.id
            ),
        )
        .await;
        Ok(())
    }

    /// Accepts a trade offered to you. Both sides' cards are exchanged at once.
    #[poise::command(slash_command, rename = "accept")]
    pub async fn trade_accept(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Trade ID from the offer"] trade_id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let now = Utc::now();
        tasks::expire_stale(db, tasks::ExpiryPolicy::from(&data.config), now).await?;

        let accepter_id = ctx.author().id.to_string();
        let details = trade::accept_trade(db, trade_id.trim(), &accepter_id, now).await?;

        ctx.send(poise::CreateReply::default().embed(trade_embed("✅ Trade Completed", &details)))
            .await?;
        notify_user(
            ctx,
            &details.trade.initiator_id,
            &format!("✅ {} accepted your trade `{}`.", ctx.author().name, details.trade.id),
        )
        .await;
        Ok(())
    }

    /// Cancels or declines a pending trade you are part of.
    #[poise::command(slash_command, rename = "cancel")]
    pub async fn trade_cancel(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Trade ID to cancel"] trade_id: String,
    ) -> Result<()> {
        let data = ctx.data();
        let canceller_id = ctx.author().id.to_string();
        let cancelled =
            trade::cancel_trade(&data.database, trade_id.trim(), &canceller_id, Utc::now()).await?;

        ctx.say(format!("🚫 Trade `{}` cancelled.", cancelled.id))
            .await?;
        let other = if cancelled.initiator_id == canceller_id {
            &cancelled.target_id
        } else {
            &cancelled.initiator_id
        };
        notify_user(
            ctx,
            other,
            &format!("🚫 {} cancelled trade `{}`.", ctx.author().name, cancelled.id),
        )
        .await;
        Ok(())
    }

    /// Lists the pending trades you have offered or received.
    #[poise::command(slash_command, rename = "list")]
    pub async fn trade_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let now = Utc::now();
        tasks::expire_stale(db, tasks::ExpiryPolicy::from(&data.config), now).await?;

        let user_id = ctx.author().id.to_string();
        let pending = trade::pending_trades_for(db, &user_id).await?;
        if pending.is_empty() {
            ctx.send(
                poise::CreateReply::default()
                    .content("You have no pending trades.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }

        let mut reply = poise::CreateReply::default().ephemeral(true);
        if pending.len() > MAX_EMBEDS {
            reply = reply.content(format!(
                "Showing the oldest {MAX_EMBEDS} of {} pending trades.",
                pending.len()
            ));
        }
        for details in pending.iter().take(MAX_EMBEDS) {
            let title = if details.trade.initiator_id == user_id {
                "📤 Sent"
            } else {
                "📥 Received"
            };
            reply = reply.embed(trade_embed(title, details));
        }
        ctx.send(reply).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
