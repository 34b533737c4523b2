//! Core business logic - framework-agnostic card game operations.
//!
//! Nothing in here knows about Discord. Every operation takes a database connection
//! (or a transaction), injected randomness where it rolls dice, and returns
//! [`crate::errors::Result`] with a typed [`crate::errors::Rejection`] for
//! user-caused failures.

/// Battle state machine: challenge, accept, expiry, bot fights
pub mod battle;
/// Card catalog lookups, creation and seeding
pub mod catalog;
/// Per-user card holdings
pub mod collection;
/// Fusion and trade-up
pub mod crafting;
/// Credits and periodic earnings
pub mod economy;
/// Rarity-gated battle effect rolls
pub mod effects;
/// Pack opening
pub mod pack;
/// Effective round power
pub mod power;
/// XP curve and level-ups
pub mod progress;
/// Trade offer rate limiting
pub mod rate_limit;
/// Admin wipes of collections, catalog and player progress
pub mod reset;
/// Round and turn resolution strategies
pub mod resolver;
/// Moving cards and rewards after a battle
pub mod settlement;
/// Trade offer, accept and cancel protocol
pub mod trade;
