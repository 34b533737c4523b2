//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin-only catalog, grant and reset commands
pub mod admin;

/// Battle and bot fight commands
pub mod battle;

/// Pack, collection, inspection and crafting commands
pub mod cards;

/// General utility and progress commands
pub mod general;

/// Trade negotiation commands
pub mod trade;

use crate::{bot::BotData, errors::Error};

// Export commands
pub use admin::*;
pub use battle::*;
pub use cards::*;
pub use general::*;
pub use trade::*;

/// Every command registered with the framework.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        battle(),
        accept(),
        fight(),
        trade(),
        open(),
        show_collection(),
        inspect(),
        tradeup(),
        fuse(),
        profile(),
        earn(),
        help(),
        ping(),
        givecard(),
        givecurrency(),
        createcard(),
        resetcollections(),
        reset(),
    ]
}
