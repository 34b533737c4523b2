//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod battle;
pub mod battle_round;
pub mod card;
pub mod collection_entry;
pub mod enums;
pub mod fused_card;
pub mod player;
pub mod trade;
pub mod trade_attempt;
pub mod trade_item;

// Re-export specific types to avoid conflicts
pub use battle::{Entity as Battle, Model as BattleModel};
pub use battle_round::{Entity as BattleRound, Model as BattleRoundModel};
pub use card::{Entity as Card, Model as CardModel};
pub use collection_entry::{Entity as CollectionEntry, Model as CollectionEntryModel};
pub use enums::{BattleStatus, CardKind, Element, Rarity, Side, TradeSide, TradeStatus};
pub use fused_card::{Entity as FusedCard, Model as FusedCardModel};
pub use player::{Entity as Player, Model as PlayerModel};
pub use trade::{Entity as Trade, Model as TradeModel};
pub use trade_attempt::{Entity as TradeAttempt, Model as TradeAttemptModel};
pub use trade_item::{Entity as TradeItem, Model as TradeItemModel};
