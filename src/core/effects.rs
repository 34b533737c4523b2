//! Battle effect rolls.
//!
//! Every rarity owns an ordered table of `(effect, trigger chance)` pairs. A roll walks
//! the table, drawing one uniform value per entry; an entry triggers when its draw is
//! below the entry's chance. Regular cards keep the first trigger only, special cards
//! may keep two. The walk order therefore decides which effect wins a contested slot,
//! which is why the tables are explicit slices rather than maps.

use crate::entities::Rarity;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A transient combat modifier rolled for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    CriticalHit,
    DefenseBoost,
    PowerSteal,
    DoublePower,
    Shield,
    /// Sentinel for "nothing triggered"
    None,
}

impl Effect {
    /// Stable tag used for persistence.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::CriticalHit => "critical_hit",
            Self::DefenseBoost => "defense_boost",
            Self::PowerSteal => "power_steal",
            Self::DoublePower => "double_power",
            Self::Shield => "shield",
            Self::None => "none",
        }
    }

    /// Multiplier attached to the effect. How it is applied depends on the effect;
    /// see [`crate::core::power`].
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::CriticalHit | Self::DoublePower => 2.0,
            Self::DefenseBoost => 1.5,
            Self::PowerSteal => 1.3,
            Self::Shield => 0.5,
            Self::None => 1.0,
        }
    }

    /// Human readable label, e.g. `CRITICAL HIT`.
    #[must_use]
    pub fn label(self) -> String {
        self.tag().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "critical_hit" => Ok(Self::CriticalHit),
            "defense_boost" => Ok(Self::DefenseBoost),
            "power_steal" => Ok(Self::PowerSteal),
            "double_power" => Ok(Self::DoublePower),
            "shield" => Ok(Self::Shield),
            "none" => Ok(Self::None),
            other => Err(format!("unknown battle effect '{other}'")),
        }
    }
}

/// Order in which a rarity's effect table is walked during a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectOrder {
    /// Declaration order of the table; earlier entries win contested slots
    #[default]
    Table,
    /// Table is shuffled before every roll, removing the positional bias
    Shuffled,
}

const COMMON: &[(Effect, f64)] = &[
    (Effect::CriticalHit, 0.05),
    (Effect::DefenseBoost, 0.10),
    (Effect::PowerSteal, 0.00),
    (Effect::DoublePower, 0.00),
    (Effect::Shield, 0.05),
];

const UNCOMMON: &[(Effect, f64)] = &[
    (Effect::CriticalHit, 0.10),
    (Effect::DefenseBoost, 0.15),
    (Effect::PowerSteal, 0.05),
    (Effect::DoublePower, 0.00),
    (Effect::Shield, 0.10),
];

const RARE: &[(Effect, f64)] = &[
    (Effect::CriticalHit, 0.15),
    (Effect::DefenseBoost, 0.20),
    (Effect::PowerSteal, 0.10),
    (Effect::DoublePower, 0.05),
    (Effect::Shield, 0.15),
];

const LEGENDARY: &[(Effect, f64)] = &[
    (Effect::CriticalHit, 0.20),
    (Effect::DefenseBoost, 0.25),
    (Effect::PowerSteal, 0.15),
    (Effect::DoublePower, 0.10),
    (Effect::Shield, 0.20),
];

const DEITY: &[(Effect, f64)] = &[
    (Effect::CriticalHit, 0.25),
    (Effect::DefenseBoost, 0.30),
    (Effect::PowerSteal, 0.20),
    (Effect::DoublePower, 0.15),
    (Effect::Shield, 0.25),
];

/// The ordered effect table for a rarity.
///
/// Fused cards already carry the summed power of two parents, so they roll on the
/// rare table.
#[must_use]
pub const fn effect_table(rarity: Rarity) -> &'static [(Effect, f64)] {
    match rarity {
        Rarity::Common => COMMON,
        Rarity::Uncommon => UNCOMMON,
        Rarity::Rare | Rarity::Fused => RARE,
        Rarity::Legendary => LEGENDARY,
        Rarity::Deity => DEITY,
    }
}

/// Trigger chance of `effect` for `rarity`; zero when the effect is not in the table.
#[must_use]
pub fn trigger_chance(rarity: Rarity, effect: Effect) -> f64 {
    effect_table(rarity)
        .iter()
        .find(|(candidate, _)| *candidate == effect)
        .map_or(0.0, |(_, chance)| *chance)
}

/// Maximum number of effects a card may carry into one round.
#[must_use]
pub const fn max_effects(special: bool) -> usize {
    if special { 2 } else { 1 }
}

/// Rolls the effects for one card for one round.
///
/// Never returns an empty list: when nothing triggers the result is `[Effect::None]`.
pub fn roll_effects<R>(rng: &mut R, rarity: Rarity, special: bool, order: EffectOrder) -> Vec<Effect>
where
    R: Rng + ?Sized,
{
    let mut table = effect_table(rarity).to_vec();
    if order == EffectOrder::Shuffled {
        table.shuffle(rng);
    }

    let limit = max_effects(special);
    let mut effects = Vec::with_capacity(limit);
    for (effect, chance) in table {
        if effects.len() >= limit {
            break;
        }
        if rng.random::<f64>() < chance {
            effects.push(effect);
        }
    }

    if effects.is_empty() {
        effects.push(Effect::None);
    }
    effects
}

/// Joins effects into their persisted form, e.g. `"critical_hit,shield"`.
#[must_use]
pub fn format_effects(effects: &[Effect]) -> String {
    effects
        .iter()
        .map(|effect| effect.tag())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses the persisted form back. Unknown tags are skipped.
#[must_use]
pub fn parse_effects(stored: &str) -> Vec<Effect> {
    let effects: Vec<Effect> = stored
        .split(',')
        .filter_map(|tag| tag.parse().ok())
        .collect();
    if effects.is_empty() {
        vec![Effect::None]
    } else {
        effects
    }
}

/// Labels for display, e.g. `"CRITICAL HIT, SHIELD"`.
#[must_use]
pub fn describe_effects(effects: &[Effect]) -> String {
    effects
        .iter()
        .map(|effect| effect.label())
        .collect::<Vec<_>>()
        .join(", ")
}
