//! Round and turn resolution.
//!
//! Two strategies decide a battle:
//!
//! - **Probabilistic** ([`best_of_three`]): each round both sides roll effects and
//!   power, then a weighted coin decides the round in proportion to the powers. The
//!   first side to two round wins takes the match; a decided match never plays a
//!   third round.
//! - **Health pool** ([`health_pool_duel`]): both sides start with health derived from
//!   power, rarity and the environment, then trade blows (challenger first) until one
//!   pool is empty or the turn limit is reached, which is a draw.

use crate::config::game::BattleConfig;
use crate::core::effects::{self, Effect, EffectOrder};
use crate::core::power::{self, VarianceBand};
use crate::entities::{Element, Rarity, Side};
use rand::Rng;
use serde::Deserialize;

/// Rounds needed to take a best-of-three match.
pub const ROUNDS_TO_WIN: i32 = 2;
/// Upper bound on rounds in a best-of-three match.
pub const MAX_ROUNDS: i32 = 3;

/// Which strategy decides player-versus-player battles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    #[default]
    Probabilistic,
    HealthPool,
}

/// The battle-relevant view of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    pub rarity: Rarity,
    pub element: Option<Element>,
    pub power: i64,
    pub special: bool,
}

/// Outcome of one round (or of a whole health-pool duel, recorded as a single round).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub round_number: i32,
    pub challenger_power: i64,
    pub defender_power: i64,
    pub challenger_effects: Vec<Effect>,
    pub defender_effects: Vec<Effect>,
    pub winner: Side,
}

/// One attack in a health-pool duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRecord {
    pub turn: u32,
    pub attacker: Side,
    pub damage: i64,
    pub critical: bool,
    pub challenger_health: i64,
    pub defender_health: i64,
}

/// Outcome of a whole match under either strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub rounds: Vec<RoundResult>,
    /// Turn log; empty for probabilistic matches
    pub turns: Vec<TurnRecord>,
    pub challenger_wins: i32,
    pub defender_wins: i32,
    /// `Side::Tie` only when a health-pool duel times out
    pub winner: Side,
}

/// Decides a single round with a weighted coin flip.
///
/// A uniform draw is scaled to `challenger_power + defender_power`; the challenger
/// wins if the draw lands inside its share. With no power on either side the coin is
/// fair.
#[allow(clippy::cast_precision_loss)]
pub fn round_winner<R>(rng: &mut R, challenger_power: i64, defender_power: i64) -> Side
where
    R: Rng + ?Sized,
{
    let challenger = challenger_power.max(0) as f64;
    let defender = defender_power.max(0) as f64;
    let total = challenger + defender;
    if total <= 0.0 {
        return if rng.random_bool(0.5) {
            Side::Challenger
        } else {
            Side::Defender
        };
    }

    let roll = rng.random::<f64>() * total;
    if roll < challenger {
        Side::Challenger
    } else {
        Side::Defender
    }
}

/// Plays one probabilistic round: effects, power, weighted coin.
pub fn play_round<R>(
    rng: &mut R,
    round_number: i32,
    challenger: &Combatant,
    defender: &Combatant,
    order: EffectOrder,
    band: VarianceBand,
) -> RoundResult
where
    R: Rng + ?Sized,
{
    let challenger_effects = effects::roll_effects(rng, challenger.rarity, challenger.special, order);
    let defender_effects = effects::roll_effects(rng, defender.rarity, defender.special, order);

    let challenger_power = power::compute_power(
        rng,
        challenger.power,
        &challenger_effects,
        &defender_effects,
        band,
    );
    let defender_power = power::compute_power(
        rng,
        defender.power,
        &defender_effects,
        &challenger_effects,
        band,
    );

    let winner = round_winner(rng, challenger_power, defender_power);
    RoundResult {
        round_number,
        challenger_power,
        defender_power,
        challenger_effects,
        defender_effects,
        winner,
    }
}

/// Plays rounds until one side has two wins.
pub fn best_of_three<R>(
    rng: &mut R,
    challenger: &Combatant,
    defender: &Combatant,
    order: EffectOrder,
    band: VarianceBand,
) -> MatchResult
where
    R: Rng + ?Sized,
{
    let mut rounds = Vec::with_capacity(3);
    let mut challenger_wins = 0;
    let mut defender_wins = 0;
    let mut round_number = 1;

    while round_number <= MAX_ROUNDS
        && challenger_wins < ROUNDS_TO_WIN
        && defender_wins < ROUNDS_TO_WIN
    {
        let round = play_round(rng, round_number, challenger, defender, order, band);
        match round.winner {
            Side::Challenger => challenger_wins += 1,
            Side::Defender => defender_wins += 1,
            Side::Tie => {}
        }
        rounds.push(round);
        round_number += 1;
    }

    let winner = match challenger_wins.cmp(&defender_wins) {
        std::cmp::Ordering::Greater => Side::Challenger,
        std::cmp::Ordering::Less => Side::Defender,
        std::cmp::Ordering::Equal => Side::Tie,
    };

    MatchResult {
        rounds,
        turns: Vec::new(),
        challenger_wins,
        defender_wins,
        winner,
    }
}

/// Elemental matchup of an attacker against a defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAdvantage {
    Strong,
    Weak,
    Neutral,
}

impl TypeAdvantage {
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Strong => 1.5,
            Self::Weak => 0.75,
            Self::Neutral => 1.0,
        }
    }
}

/// The element each element is strong against on the type wheel.
const fn beats(element: Element) -> Option<Element> {
    match element {
        Element::Blood => Some(Element::Mind),
        Element::Mind => Some(Element::Time),
        Element::Time => Some(Element::Tech),
        Element::Tech => Some(Element::Arcane),
        Element::Arcane => Some(Element::Necrotic),
        Element::Necrotic => Some(Element::Blood),
        Element::Deity => None,
    }
}

/// Type effectiveness of `attacker` hitting `defender`.
///
/// Deity is strong against every other element and weak against Deity. Cards
/// without an element are always neutral.
#[must_use]
pub fn type_effectiveness(attacker: Option<Element>, defender: Option<Element>) -> TypeAdvantage {
    let (Some(attacker), Some(defender)) = (attacker, defender) else {
        return TypeAdvantage::Neutral;
    };

    match (attacker, defender) {
        (Element::Deity, Element::Deity) => TypeAdvantage::Weak,
        (Element::Deity, _) => TypeAdvantage::Strong,
        _ if beats(attacker) == Some(defender) => TypeAdvantage::Strong,
        _ if beats(defender) == Some(attacker) => TypeAdvantage::Weak,
        _ => TypeAdvantage::Neutral,
    }
}

/// Health multiplier per rarity tier.
#[must_use]
pub const fn rarity_health_multiplier(rarity: Rarity) -> f64 {
    match rarity {
        Rarity::Common => 1.0,
        Rarity::Uncommon => 1.25,
        Rarity::Rare => 1.5,
        Rarity::Legendary => 2.0,
        Rarity::Fused => 2.5,
        Rarity::Deity => 3.0,
    }
}

/// Tuning for health-pool duels.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthPoolRules {
    pub max_turns: u32,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub damage_variance: VarianceBand,
    /// Elements favoured by the current environment
    pub conditions: Vec<Element>,
    pub condition_health_bonus: f64,
    pub condition_damage_multiplier: f64,
}

impl From<&BattleConfig> for HealthPoolRules {
    fn from(config: &BattleConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            crit_chance: config.crit_chance.clamp(0.0, 1.0),
            crit_multiplier: config.crit_multiplier,
            damage_variance: VarianceBand::symmetric(config.damage_variance),
            conditions: config.conditions.clone(),
            condition_health_bonus: config.condition_health_bonus,
            condition_damage_multiplier: config.condition_damage_multiplier,
        }
    }
}

impl Default for HealthPoolRules {
    fn default() -> Self {
        Self::from(&BattleConfig::default())
    }
}

impl HealthPoolRules {
    fn favoured(&self, element: Option<Element>) -> bool {
        element.is_some_and(|element| self.conditions.contains(&element))
    }
}

/// Starting health of a combatant. Always at least 1.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn starting_health(combatant: &Combatant, rules: &HealthPoolRules) -> i64 {
    let mut health = combatant.power.max(0) as f64 * rarity_health_multiplier(combatant.rarity);
    if rules.favoured(combatant.element) {
        health *= rules.condition_health_bonus;
    }
    let health = health.floor();
    if health.is_finite() && health >= 1.0 {
        health as i64
    } else {
        1
    }
}

/// Rolls the damage of one attack. Returns `(damage, critical)`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn roll_damage<R>(
    rng: &mut R,
    attacker: &Combatant,
    defender: &Combatant,
    rules: &HealthPoolRules,
) -> (i64, bool)
where
    R: Rng + ?Sized,
{
    let mut damage = attacker.power.max(0) as f64
        * type_effectiveness(attacker.element, defender.element).multiplier();
    if rules.favoured(attacker.element) {
        damage *= rules.condition_damage_multiplier;
    }
    let critical = rng.random::<f64>() < rules.crit_chance;
    if critical {
        damage *= rules.crit_multiplier;
    }
    damage *= rules.damage_variance.sample(rng);

    let damage = damage.floor();
    if damage.is_finite() && damage > 0.0 {
        (damage as i64, critical)
    } else {
        (0, critical)
    }
}

/// Runs a health-pool duel. Turns alternate challenger then defender and the duel
/// stops the moment a pool is empty, or after `max_turns` attacks as a draw.
pub fn health_pool_duel<R>(
    rng: &mut R,
    challenger: &Combatant,
    defender: &Combatant,
    rules: &HealthPoolRules,
) -> MatchResult
where
    R: Rng + ?Sized,
{
    let mut challenger_health = starting_health(challenger, rules);
    let mut defender_health = starting_health(defender, rules);
    let mut turns = Vec::new();
    let mut challenger_damage = 0;
    let mut defender_damage = 0;

    for turn in 1..=rules.max_turns {
        let attacker_side = if turn % 2 == 1 {
            Side::Challenger
        } else {
            Side::Defender
        };

        let damage = if attacker_side == Side::Challenger {
            let (damage, critical) = roll_damage(rng, challenger, defender, rules);
            defender_health = (defender_health - damage).max(0);
            challenger_damage += damage;
            (damage, critical)
        } else {
            let (damage, critical) = roll_damage(rng, defender, challenger, rules);
            challenger_health = (challenger_health - damage).max(0);
            defender_damage += damage;
            (damage, critical)
        };

        turns.push(TurnRecord {
            turn,
            attacker: attacker_side,
            damage: damage.0,
            critical: damage.1,
            challenger_health,
            defender_health,
        });

        if challenger_health == 0 || defender_health == 0 {
            break;
        }
    }

    let winner = if defender_health == 0 {
        Side::Challenger
    } else if challenger_health == 0 {
        Side::Defender
    } else {
        Side::Tie
    };

    let round = RoundResult {
        round_number: 1,
        challenger_power: challenger_damage,
        defender_power: defender_damage,
        challenger_effects: vec![Effect::None],
        defender_effects: vec![Effect::None],
        winner,
    };

    MatchResult {
        rounds: vec![round],
        turns,
        challenger_wins: i32::from(winner == Side::Challenger),
        defender_wins: i32::from(winner == Side::Defender),
        winner,
    }
}

/// Resolves a match with the strategy chosen in `config`.
pub fn resolve_match<R>(
    rng: &mut R,
    challenger: &Combatant,
    defender: &Combatant,
    config: &BattleConfig,
) -> MatchResult
where
    R: Rng + ?Sized,
{
    match config.resolver {
        ResolverKind::Probabilistic => best_of_three(
            rng,
            challenger,
            defender,
            config.effect_order,
            VarianceBand::symmetric(config.variance),
        ),
        ResolverKind::HealthPool => {
            health_pool_duel(rng, challenger, defender, &HealthPoolRules::from(config))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn combatant(rarity: Rarity, element: Option<Element>, power: i64) -> Combatant {
        Combatant {
            rarity,
            element,
            power,
            special: false,
        }
    }

    #[test]
    fn test_even_powers_converge_to_half() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 10_000;
        let challenger_wins = (0..trials)
            .filter(|_| round_winner(&mut rng, 50, 50) == Side::Challenger)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let rate = challenger_wins as f64 / f64::from(trials);
        assert!((rate - 0.5).abs() < 0.03, "win rate {rate}");
    }

    #[test]
    fn test_even_cards_without_effects_converge_to_half() {
        // Common cards rarely trigger effects; use full rounds to include variance.
        let mut rng = StdRng::seed_from_u64(77);
        let card = combatant(Rarity::Common, None, 50);
        let trials = 10_000;
        let challenger_wins = (0..trials)
            .filter(|_| {
                play_round(
                    &mut rng,
                    1,
                    &card,
                    &card,
                    EffectOrder::Table,
                    VarianceBand::default(),
                )
                .winner
                    == Side::Challenger
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let rate = challenger_wins as f64 / f64::from(trials);
        assert!((rate - 0.5).abs() < 0.03, "win rate {rate}");
    }

    #[test]
    fn test_weighted_coin_favours_stronger_side() {
        let mut rng = StdRng::seed_from_u64(5);
        let trials = 10_000;
        let challenger_wins = (0..trials)
            .filter(|_| round_winner(&mut rng, 90, 10) == Side::Challenger)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let rate = challenger_wins as f64 / f64::from(trials);
        assert!((rate - 0.9).abs() < 0.03, "win rate {rate}");
        // Zero power can never win against positive power
        for _ in 0..1_000 {
            assert_eq!(round_winner(&mut rng, 0, 10), Side::Defender);
        }
    }

    #[test]
    fn test_best_of_three_stops_when_decided() {
        let mut rng = StdRng::seed_from_u64(42);
        let strong = combatant(Rarity::Rare, None, 80);
        let weak = combatant(Rarity::Common, None, 20);
        for _ in 0..2_000 {
            let result = best_of_three(
                &mut rng,
                &strong,
                &weak,
                EffectOrder::Table,
                VarianceBand::default(),
            );
            assert!((2..=3).contains(&result.rounds.len()));
            assert_eq!(result.challenger_wins.max(result.defender_wins), ROUNDS_TO_WIN);
            if result.rounds.len() == 3 {
                // A third round is only played from 1-1
                assert_ne!(result.rounds[0].winner, result.rounds[1].winner);
            } else {
                assert_eq!(result.rounds[0].winner, result.rounds[1].winner);
            }
            assert_ne!(result.winner, Side::Tie);
            let numbers: Vec<i32> = result.rounds.iter().map(|r| r.round_number).collect();
            assert_eq!(numbers, (1..=i32::try_from(numbers.len()).unwrap_or(0)).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_type_wheel() {
        use Element::{Arcane, Blood, Deity, Mind, Necrotic, Tech, Time};
        assert_eq!(type_effectiveness(Some(Blood), Some(Mind)), TypeAdvantage::Strong);
        assert_eq!(type_effectiveness(Some(Mind), Some(Blood)), TypeAdvantage::Weak);
        assert_eq!(type_effectiveness(Some(Necrotic), Some(Blood)), TypeAdvantage::Strong);
        assert_eq!(type_effectiveness(Some(Tech), Some(Arcane)), TypeAdvantage::Strong);
        assert_eq!(type_effectiveness(Some(Time), Some(Arcane)), TypeAdvantage::Neutral);
        assert_eq!(type_effectiveness(Some(Deity), Some(Time)), TypeAdvantage::Strong);
        assert_eq!(type_effectiveness(Some(Deity), Some(Deity)), TypeAdvantage::Weak);
        assert_eq!(type_effectiveness(Some(Blood), Some(Deity)), TypeAdvantage::Neutral);
        assert_eq!(type_effectiveness(None, Some(Blood)), TypeAdvantage::Neutral);
        assert_eq!(TypeAdvantage::Strong.multiplier(), 1.5);
        assert_eq!(TypeAdvantage::Weak.multiplier(), 0.75);
    }

    #[test]
    fn test_starting_health_uses_rarity_and_conditions() {
        let mut rules = HealthPoolRules::default();
        assert_eq!(starting_health(&combatant(Rarity::Legendary, Some(Element::Blood), 100), &rules), 200);
        rules.conditions = vec![Element::Blood];
        assert_eq!(starting_health(&combatant(Rarity::Legendary, Some(Element::Blood), 100), &rules), 240);
        assert_eq!(starting_health(&combatant(Rarity::Legendary, Some(Element::Mind), 100), &rules), 200);
        assert_eq!(starting_health(&combatant(Rarity::Common, None, 0), &rules), 1);
    }

    #[test]
    fn test_duel_terminates_within_turn_limit() {
        let mut rng = StdRng::seed_from_u64(8);
        let rules = HealthPoolRules {
            max_turns: 6,
            ..HealthPoolRules::default()
        };
        // Zero-power cards can never deal damage, so only the limit ends the duel.
        let idle = combatant(Rarity::Common, None, 0);
        let result = health_pool_duel(&mut rng, &idle, &idle, &rules);
        assert_eq!(result.turns.len(), 6);
        assert_eq!(result.winner, Side::Tie);
        assert_eq!(result.challenger_wins + result.defender_wins, 0);
    }

    #[test]
    fn test_duel_stops_when_pool_is_empty() {
        let mut rng = StdRng::seed_from_u64(13);
        let rules = HealthPoolRules::default();
        let giant = combatant(Rarity::Deity, Some(Element::Deity), 500);
        let minnow = combatant(Rarity::Common, Some(Element::Blood), 10);
        let result = health_pool_duel(&mut rng, &giant, &minnow, &rules);
        // 500 * 1.5 * >=0.85 is far beyond the minnow's 10 health: one hit ends it.
        assert_eq!(result.turns.len(), 1);
        assert_eq!(result.winner, Side::Challenger);
        assert_eq!(result.turns[0].attacker, Side::Challenger);
        assert_eq!(result.turns[0].defender_health, 0);
    }

    #[test]
    fn test_duel_alternates_turns() {
        let mut rng = StdRng::seed_from_u64(21);
        let rules = HealthPoolRules::default();
        let a = combatant(Rarity::Legendary, Some(Element::Time), 40);
        let b = combatant(Rarity::Legendary, Some(Element::Arcane), 40);
        let result = health_pool_duel(&mut rng, &a, &b, &rules);
        for (index, turn) in result.turns.iter().enumerate() {
            let expected = if index % 2 == 0 {
                Side::Challenger
            } else {
                Side::Defender
            };
            assert_eq!(turn.attacker, expected);
            assert!(turn.challenger_health >= 0 && turn.defender_health >= 0);
        }
        assert!(result.turns.len() <= rules.max_turns as usize);
    }
}
