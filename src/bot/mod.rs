//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `TcgBuddy` application,
//! including all slash commands, autocomplete handlers, background tasks and bot
//! context management.

/// Discord command implementations (battle, trade, cards, general, admin)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Background maintenance tasks
pub mod tasks;

use crate::{
    config::GameConfig,
    core::rate_limit::TradeRateLimiter,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection, the game configuration and the
/// trade rate limiter that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Game tuning loaded from config.toml
    pub config: GameConfig,
    /// Per-user limiter for trade offers
    pub rate_limiter: TradeRateLimiter,
}

impl BotData {
    /// Creates a new `BotData` instance, selecting the trade rate-limit backend
    /// from the configuration.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: GameConfig) -> Self {
        let rate_limiter = TradeRateLimiter::from_config(&config.trade, &database);
        Self {
            database,
            config,
            rate_limiter,
        }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = if let Some(rejection) = error.as_rejection() {
                format!("❌ {rejection}")
            } else {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
                "❌ Something went wrong. Please try again later.".to_string()
            };
            let reply = poise::CreateReply::default().content(message).ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Sends a direct message to a user by Discord ID.
///
/// Delivery failures (closed DMs, unknown users) are logged and otherwise ignored.
pub async fn notify_user(ctx: poise::Context<'_, BotData, Error>, user_id: &str, content: &str) {
    let Some(id) = user_id.parse::<u64>().ok().filter(|id| *id != 0) else {
        warn!(user_id, "Cannot notify user with a malformed ID");
        return;
    };

    let sent = async {
        let channel = serenity::UserId::new(id)
            .create_dm_channel(ctx.http())
            .await?;
        channel
            .send_message(ctx.http(), serenity::CreateMessage::new().content(content))
            .await?;
        Ok::<_, serenity::Error>(())
    }
    .await;

    if let Err(e) = sent {
        warn!(user_id, "Failed to deliver direct message: {e}");
    }
}

/// Builds the poise framework and runs the Discord client until it stops.
///
/// # Errors
/// Returns an error if the client cannot be created or the gateway connection fails.
#[instrument(skip(token, config, database))]
pub async fn run_bot(token: String, config: GameConfig, database: DatabaseConnection) -> Result<()> {
    tasks::spawn_expiry_task(database.clone(), tasks::ExpiryPolicy::from(&config));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(database, config))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;
