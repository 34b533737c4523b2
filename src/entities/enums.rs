//! Enumerated column types shared by several entities.
//!
//! All of them are stored as lowercase text so the database stays readable
//! with an ordinary `SQLite` shell.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal tier of a card. Declaration order is the tier order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[sea_orm(string_value = "common")]
    Common,
    #[sea_orm(string_value = "uncommon")]
    Uncommon,
    #[sea_orm(string_value = "rare")]
    Rare,
    #[sea_orm(string_value = "legendary")]
    Legendary,
    #[sea_orm(string_value = "deity")]
    Deity,
    #[sea_orm(string_value = "fused")]
    Fused,
}

impl Rarity {
    /// The rarity a trade-up of this rarity produces, if any.
    #[must_use]
    pub const fn next_tier(self) -> Option<Self> {
        match self {
            Self::Common => Some(Self::Uncommon),
            Self::Uncommon => Some(Self::Rare),
            Self::Rare => Some(Self::Legendary),
            Self::Legendary | Self::Deity | Self::Fused => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
            Self::Deity => "deity",
            Self::Fused => "fused",
        }
    }

    /// Emoji used when listing cards of this rarity.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Common => "⚪",
            Self::Uncommon => "🟢",
            Self::Rare => "🔵",
            Self::Legendary => "🟣",
            Self::Deity => "🌟",
            Self::Fused => "✨",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elemental type of a card, used for type advantage in health-pool battles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Element {
    #[sea_orm(string_value = "Blood")]
    Blood,
    #[sea_orm(string_value = "Mind")]
    Mind,
    #[sea_orm(string_value = "Time")]
    Time,
    #[sea_orm(string_value = "Tech")]
    Tech,
    #[sea_orm(string_value = "Arcane")]
    Arcane,
    #[sea_orm(string_value = "Necrotic")]
    Necrotic,
    #[sea_orm(string_value = "Deity")]
    Deity,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blood => "Blood",
            Self::Mind => "Mind",
            Self::Time => "Time",
            Self::Tech => "Tech",
            Self::Arcane => "Arcane",
            Self::Necrotic => "Necrotic",
            Self::Deity => "Deity",
        };
        f.write_str(name)
    }
}

/// Discriminant of a [`crate::core::catalog::CardRef`]: which catalog table the id points into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CardKind {
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "fused")]
    Fused,
}

/// Lifecycle of a battle challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum BattleStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BattleStatus {
    /// Pending and in-progress battles block their participants from new ones.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Which side took a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Side {
    #[sea_orm(string_value = "challenger")]
    Challenger,
    #[sea_orm(string_value = "defender")]
    Defender,
    #[sea_orm(string_value = "tie")]
    Tie,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Challenger => "CHALLENGER",
            Self::Defender => "DEFENDER",
            Self::Tie => "TIE",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a trade offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TradeStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Whether a trade line is given by the initiator or asked of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TradeSide {
    #[sea_orm(string_value = "offered")]
    Offered,
    #[sea_orm(string_value = "requested")]
    Requested,
}
