//! Effective power of a card for one round.
//!
//! Offensive effects multiply the running power. Defensive effects add a flat bonus
//! derived from the base power. An opponent's `power_steal` shrinks the owner's power
//! by `2 - multiplier`. A random variance factor is applied last and the result is
//! floored and clamped at zero.

use crate::core::effects::Effect;
use rand::Rng;

/// Uniform band the final variance factor is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceBand {
    low: f64,
    high: f64,
}

impl VarianceBand {
    /// A band of `1 - width ..= 1 + width`. Widths outside `0..1` are clamped.
    #[must_use]
    pub fn symmetric(width: f64) -> Self {
        let width = if width.is_finite() { width.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            low: 1.0 - width,
            high: 1.0 + width,
        }
    }

    /// A band that always yields exactly 1.0.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            low: 1.0,
            high: 1.0,
        }
    }

    #[must_use]
    pub const fn low(&self) -> f64 {
        self.low
    }

    #[must_use]
    pub const fn high(&self) -> f64 {
        self.high
    }

    /// Draws a factor in `[low, high)`.
    pub fn sample<R>(&self, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        self.low + rng.random::<f64>() * (self.high - self.low)
    }
}

impl Default for VarianceBand {
    fn default() -> Self {
        Self::symmetric(0.2)
    }
}

/// Computes round power with an explicit variance factor.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn power_with_factor(base: i64, own: &[Effect], opponent: &[Effect], factor: f64) -> i64 {
    let base = base.max(0) as f64;
    let mut power = base;
    let mut defense = 0.0;

    for effect in own {
        match effect {
            Effect::CriticalHit | Effect::PowerSteal | Effect::DoublePower => {
                power *= effect.multiplier();
            }
            Effect::DefenseBoost => defense += base * (effect.multiplier() - 1.0),
            Effect::Shield => defense += base * (1.0 - effect.multiplier()),
            Effect::None => {}
        }
    }

    for effect in opponent {
        if *effect == Effect::PowerSteal {
            power *= 2.0 - effect.multiplier();
        }
    }

    let factor = if factor.is_finite() { factor } else { 1.0 };
    let total = ((power + defense) * factor).floor();
    if total.is_finite() && total > 0.0 {
        total as i64
    } else {
        0
    }
}

/// Computes round power, drawing the variance factor from `band`.
pub fn compute_power<R>(
    rng: &mut R,
    base: i64,
    own: &[Effect],
    opponent: &[Effect],
    band: VarianceBand,
) -> i64
where
    R: Rng + ?Sized,
{
    let factor = band.sample(rng);
    power_with_factor(base, own, opponent, factor)
}
