//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    Battle, BattleRound, Card, CollectionEntry, FusedCard, Player, Trade, TradeAttempt, TradeItem,
};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/tcg_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory holding a file-backed `SQLite` database, if any.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or(rest);
    match Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| Error::Config {
                message: format!("Failed to create database directory {}: {e}", dir.display()),
            })
        }
        _ => Ok(()),
    }
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_dir(&database_url)?;
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables (if missing) using `SeaORM`'s schema generation from entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Card).await?;
    create_table(db, &schema, FusedCard).await?;
    create_table(db, &schema, CollectionEntry).await?;
    create_table(db, &schema, Player).await?;
    create_table(db, &schema, Battle).await?;
    create_table(db, &schema, BattleRound).await?;
    create_table(db, &schema, Trade).await?;
    create_table(db, &schema, TradeItem).await?;
    create_table(db, &schema, TradeAttempt).await?;

    info!("Database tables are in place");
    Ok(())
}
