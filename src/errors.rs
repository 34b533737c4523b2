//! Unified error types for the card game bot.
//!
//! Two families live here. [`Rejection`] is the set of expected, user-caused
//! outcomes (validation failures) that are rendered straight back to the user.
//! [`Error`] wraps a `Rejection` together with the infrastructure failures
//! (database, framework, configuration) that are logged and reported generically.

use thiserror::Error;

/// A typed reason for refusing a battle, trade or economy request.
///
/// The `Display` text of every variant is written to be shown to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("You cannot target yourself.")]
    SelfTarget,

    #[error("One or both players are already in an active battle!")]
    AlreadyInBattle,

    #[error("You don't have \"{name}\" in your collection!")]
    CardNotOwned { name: String },

    #[error("Not enough copies of \"{name}\" held by {owner}: {available} available, {requested} needed.")]
    InsufficientQuantity {
        owner: String,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("\"{name}\" is a special card and cannot be traded.")]
    SpecialCardUntradeable { name: String },

    #[error("\"{name}\" is already part of a pending trade.")]
    AlreadyPledged { name: String },

    #[error("You can only trade up to {max} cards at once.")]
    TooManyCards { max: usize },

    #[error("A trade must include at least one card on each side.")]
    EmptyTrade,

    #[error("You're trading too quickly. Please wait {seconds_left} seconds before trying again.")]
    RateLimited { seconds_left: u64 },

    #[error("You don't have any pending battle challenges!")]
    NoPendingBattle,

    #[error("The challenger no longer has their card, so the battle was cancelled.")]
    ChallengerCardGone,

    #[error("Trade offer not found or already processed.")]
    TradeNotFound,

    #[error("This trade offer is not for you.")]
    NotTradeTarget,

    #[error("You cannot cancel this trade offer.")]
    NotTradeParty,

    #[error("Trade cancelled: cards are no longer available.")]
    TradeNoLongerValid,

    #[error("{user} doesn't have any cards to battle with!")]
    EmptyCollection { user: String },

    #[error("You need {required} credits but only have {available}.")]
    InsufficientCredits { available: i64, required: i64 },

    #[error("You need to wait {minutes_left} more minutes before earning again.")]
    Cooldown { minutes_left: i64 },

    #[error("You are not authorized to use this command.")]
    NotAuthorized,

    #[error("{name} cards cannot be traded up any further.")]
    MaxRarity { name: String },

    #[error("No {rarity} cards are available in the catalog.")]
    EmptyRarityPool { rarity: String },

    #[error("A card named \"{name}\" already exists.")]
    DuplicateCard { name: String },

    #[error("Invalid card definition: {reason}")]
    InvalidCard { reason: String },

    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("Card not found: {name}")]
    CardNotFound { name: String },

    #[error("Inconsistent stored state: {message}")]
    Inconsistent { message: String },

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Returns the rejection if this error is an expected, user-facing refusal.
    #[must_use]
    pub const fn as_rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
