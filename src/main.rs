use dotenvy::dotenv;
use std::env;
use tcg_buddy::{
    bot,
    config::{self, database},
    core::catalog,
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the game configuration
    let game_config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading game configuration: {e}"))?;
    info!(
        "Loaded game configuration with {} seed cards.",
        game_config.cards.len()
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed the card catalog
    catalog::seed_catalog(&db, &game_config.cards)
        .await
        .inspect_err(|e| error!("Failed to seed card catalog: {e}"))?;

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, game_config, db).await
}
