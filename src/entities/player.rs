//! Player entity - Progress and wallet of a Discord user.
//!
//! Holds experience, level, credit balance and the last time the user claimed
//! their periodic earnings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Player database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "players")]
pub struct Model {
    /// Discord user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub username: String,
    /// Experience carried towards the next level
    pub xp: i64,
    /// Current level, starting at 1
    pub level: i64,
    /// Currency balance
    pub credits: i64,
    pub last_earn_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
