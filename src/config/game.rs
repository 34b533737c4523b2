//! Game configuration loading from config.toml
//!
//! Every tunable of the economy, trade protocol and battle engine lives here, along
//! with the initial card catalog used to seed the database on first run. All fields
//! carry defaults, so a missing file section (or an empty file) is a valid config.

use crate::core::effects::EffectOrder;
use crate::core::rate_limit::RateLimitBackend;
use crate::core::resolver::ResolverKind;
use crate::entities::{Element, Rarity};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub economy: EconomyConfig,
    pub trade: TradeConfig,
    pub battle: BattleConfig,
    /// Catalog seed; cards already present by name are left untouched
    pub cards: Vec<CardSeed>,
}

/// Credits, packs and periodic earnings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Credits a brand-new player starts with
    pub default_credits: i64,
    pub pack_cost: i64,
    pub earn_cooldown_hours: i64,
    /// Chance that a pack's rare slot is upgraded to legendary
    pub legendary_chance: f64,
    /// Chance that a pulled or traded-up card is a special copy
    pub special_chance: f64,
    /// Name prefix for special copies; special copies are only generated when set
    pub special_prefix: Option<String>,
    pub currency_name: String,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            default_credits: 10,
            pack_cost: 5,
            earn_cooldown_hours: 12,
            legendary_chance: 0.01,
            special_chance: 0.1,
            special_prefix: None,
            currency_name: "credits".to_string(),
        }
    }
}

impl EconomyConfig {
    /// Special copies can only be produced when a display prefix is configured.
    #[must_use]
    pub fn can_generate_special_cards(&self) -> bool {
        self.special_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.trim().is_empty())
    }
}

/// Trade offer limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub max_cards_per_side: usize,
    pub rate_limit_window_secs: u64,
    pub max_offers_per_window: usize,
    pub pending_ttl_hours: i64,
    pub rate_limit_backend: RateLimitBackend,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            max_cards_per_side: 10,
            rate_limit_window_secs: 60,
            max_offers_per_window: 3,
            pending_ttl_hours: 24,
            rate_limit_backend: RateLimitBackend::Memory,
        }
    }
}

/// Battle engine tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub resolver: ResolverKind,
    /// Half-width of the final power variance band (0.2 means x0.8 to x1.2)
    pub variance: f64,
    pub effect_order: EffectOrder,
    pub pending_ttl_minutes: i64,
    /// XP awarded to the winner of a player-versus-player battle
    pub win_xp: i64,
    /// Health-pool battles give up after this many turns and call a draw
    pub max_turns: u32,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    /// Half-width of the per-turn damage variance band in health-pool battles
    pub damage_variance: f64,
    /// Elements favoured by the current environment
    pub conditions: Vec<Element>,
    pub condition_health_bonus: f64,
    pub condition_damage_multiplier: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverKind::Probabilistic,
            variance: 0.2,
            effect_order: EffectOrder::Table,
            pending_ttl_minutes: 60,
            win_xp: 15,
            max_turns: 20,
            crit_chance: 0.1,
            crit_multiplier: 1.5,
            damage_variance: 0.15,
            conditions: Vec::new(),
            condition_health_bonus: 1.2,
            condition_damage_multiplier: 1.25,
        }
    }
}

/// One card of the seed catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CardSeed {
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(rename = "set", default = "default_set_name")]
    pub set_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub power: i64,
}

fn default_set_name() -> String {
    "Base".to_string()
}

/// Loads game configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GameConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `CONFIG_PATH`, or ./config.toml when unset.
///
/// A missing file is not an error; the defaults are used instead.
pub fn load_default_config() -> Result<GameConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(path)
    } else {
        tracing::warn!("No config file at {path}, using built-in defaults");
        Ok(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: GameConfig = toml::from_str("").unwrap();
        assert_eq!(config.economy.pack_cost, 5);
        assert_eq!(config.trade.max_cards_per_side, 10);
        assert_eq!(config.trade.max_offers_per_window, 3);
        assert_eq!(config.battle.resolver, ResolverKind::Probabilistic);
        assert_eq!(config.battle.effect_order, EffectOrder::Table);
        assert!(config.cards.is_empty());
        assert!(!config.economy.can_generate_special_cards());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [economy]
            pack_cost = 7
            special_prefix = "Shiny"

            [trade]
            rate_limit_backend = "database"

            [battle]
            resolver = "health_pool"
            effect_order = "shuffled"
            conditions = ["Blood", "Arcane"]
            max_turns = 12

            [[cards]]
            name = "Ember Fox"
            description = "A fox wreathed in cinders"
            rarity = "common"
            element = "Blood"
            set = "Wilds"
            power = 50

            [[cards]]
            name = "The Unnamed"
            description = "It was here first"
            rarity = "deity"
            element = "Deity"
            power = 400
        "#;

        let config: GameConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.economy.pack_cost, 7);
        assert_eq!(config.economy.default_credits, 10);
        assert!(config.economy.can_generate_special_cards());
        assert_eq!(config.trade.rate_limit_backend, RateLimitBackend::Database);
        assert_eq!(config.battle.resolver, ResolverKind::HealthPool);
        assert_eq!(config.battle.effect_order, EffectOrder::Shuffled);
        assert_eq!(config.battle.conditions, vec![Element::Blood, Element::Arcane]);
        assert_eq!(config.battle.max_turns, 12);
        assert_eq!(config.cards.len(), 2);
        assert_eq!(config.cards[0].set_name, "Wilds");
        assert_eq!(config.cards[0].rarity, Rarity::Common);
        assert_eq!(config.cards[1].set_name, "Base");
        assert_eq!(config.cards[1].element, Some(Element::Deity));
    }

    #[test]
    fn test_invalid_rarity_is_rejected() {
        let toml_str = r#"
            [[cards]]
            name = "Broken"
            description = "x"
            rarity = "mythic"
        "#;
        assert!(toml::from_str::<GameConfig>(toml_str).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: GameConfig = toml::from_str(include_str!("../../config.toml")).unwrap();
        assert!(config.cards.iter().any(|card| card.name == "Ember Fox"));
        assert!(config.economy.can_generate_special_cards());
        for seed in &config.cards {
            crate::core::catalog::NewCard::from(seed).validate().unwrap();
        }
    }
}
