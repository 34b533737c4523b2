/// Database configuration and connection management
pub mod database;

/// Game tuning and catalog seed loading from config.toml
pub mod game;

/// Administrator identity from environment variables
pub mod admin;

pub use game::{GameConfig, load_config, load_default_config};
