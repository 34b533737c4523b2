//! Trade negotiation - Offering, accepting and cancelling card exchanges.
//!
//! An offer names cards the initiator gives (`Offered` lines) and cards the target
//! gives in return (`Requested` lines). Offers are validated against current
//! holdings and against everything the same user has already pledged to other
//! pending trades. Holdings may change while an offer waits, so acceptance
//! validates again inside the transaction that performs the exchange; a trade
//! that no longer checks out is cancelled instead of completed.
//!
//! Only regular copies are ever exchanged. Special copies are untradeable.

use crate::{
    config::game::TradeConfig,
    core::{
        catalog::{self, CardRef, CardView},
        collection,
        rate_limit::{RateDecision, RateLimiter},
    },
    entities::{Trade, TradeItem, TradeSide, TradeStatus, trade, trade_item},
    errors::{Rejection, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// One `(card, quantity)` line of a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeLine {
    pub card: CardView,
    pub quantity: i64,
}

/// A trade with both sides' lines resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeDetails {
    pub trade: trade::Model,
    /// Given by the initiator
    pub offered: Vec<TradeLine>,
    /// Given by the target
    pub requested: Vec<TradeLine>,
}

/// A trade offer as typed by the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRequest<'a> {
    pub initiator_id: &'a str,
    pub target_id: &'a str,
    /// Comma-separated card list the initiator gives
    pub offered: &'a str,
    /// Comma-separated card list the initiator wants
    pub requested: &'a str,
}

/// Parses a comma-separated card list such as `"Ember Fox x2, Ash Owl"`.
///
/// Each entry may carry a quantity as a trailing `xN` or a leading `Nx`; it
/// defaults to one. Empty entries are ignored and repeated names are merged,
/// saturating at `i64::MAX`.
#[must_use]
pub fn parse_card_list(input: &str) -> Vec<(String, i64)> {
    let mut lines: Vec<(String, i64)> = Vec::new();
    for raw in input.split(',') {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, quantity) = split_quantity(entry);
        if let Some(line) = lines
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            line.1 = line.1.saturating_add(quantity);
        } else {
            lines.push((name, quantity));
        }
    }
    lines
}

fn split_quantity(entry: &str) -> (String, i64) {
    let parse_count = |token: &str| {
        token
            .trim_matches(|c| c == 'x' || c == 'X')
            .parse::<i64>()
            .ok()
            .filter(|count| *count > 0)
    };

    let trailing = entry
        .rsplit_once(char::is_whitespace)
        .filter(|(_, last)| last.starts_with(['x', 'X']))
        .and_then(|(name, last)| Some((name, parse_count(last)?)));
    let leading = || {
        entry
            .split_once(char::is_whitespace)
            .filter(|(first, _)| first.ends_with(['x', 'X']))
            .and_then(|(first, name)| Some((name, parse_count(first)?)))
    };

    match trailing.or_else(leading) {
        Some((name, count)) => (name.trim().to_string(), count),
        None => (entry.to_string(), 1),
    }
}

/// Units of `card` that `user_id` has pledged as a giver to pending trades.
async fn pledged_units<C>(db: &C, user_id: &str, card: CardRef) -> Result<i64>
where
    C: ConnectionTrait,
{
    let query = Trade::find()
        .filter(trade::Column::Status.eq(TradeStatus::Pending))
        .filter(
            Condition::any()
                .add(trade::Column::InitiatorId.eq(user_id))
                .add(trade::Column::TargetId.eq(user_id)),
        );

    let mut pledged = 0;
    for (pending, items) in query.find_with_related(TradeItem).all(db).await? {
        let giving_side = if pending.initiator_id == user_id {
            TradeSide::Offered
        } else {
            TradeSide::Requested
        };
        pledged += items
            .iter()
            .filter(|item| {
                item.side == giving_side
                    && CardRef::new(item.card_kind, item.card_id) == card
            })
            .map(|item| item.quantity)
            .sum::<i64>();
    }
    Ok(pledged)
}

/// True when a parsed side names more than `max` units in total.
fn exceeds_side_limit(names: &[(String, i64)], max: usize) -> bool {
    let limit = i64::try_from(max).unwrap_or(i64::MAX);
    if names.len() > max || names.iter().any(|(_, quantity)| *quantity > limit) {
        return true;
    }
    names
        .iter()
        .try_fold(0i64, |total, (_, quantity)| total.checked_add(*quantity))
        .is_none_or(|total| total > limit)
}

/// Checks that `owner_id` can give every named card, returning the resolved lines.
async fn validate_side<C>(
    db: &C,
    owner_id: &str,
    is_caller: bool,
    names: &[(String, i64)],
) -> Result<Vec<TradeLine>>
where
    C: ConnectionTrait,
{
    let mut lines: Vec<TradeLine> = Vec::with_capacity(names.len());
    for (name, quantity) in names {
        let card = catalog::find_card_by_name(db, name).await?;
        let Some(card) = card else {
            return Err(if is_caller {
                Rejection::CardNotOwned { name: name.clone() }
            } else {
                Rejection::InsufficientQuantity {
                    owner: collection::mention(owner_id),
                    name: name.clone(),
                    available: 0,
                    requested: *quantity,
                }
            }
            .into());
        };

        // A name may resolve to a card already listed under different casing
        let quantity = lines
            .iter()
            .filter(|line| line.card.card_ref == card.card_ref)
            .fold(*quantity, |total, line| total.saturating_add(line.quantity));
        lines.retain(|line| line.card.card_ref != card.card_ref);

        let held = collection::quantity_of(db, owner_id, card.card_ref, false).await?;
        if held == 0 {
            let special = collection::quantity_of(db, owner_id, card.card_ref, true).await?;
            if special > 0 {
                return Err(Rejection::SpecialCardUntradeable { name: card.name }.into());
            }
            if is_caller {
                return Err(Rejection::CardNotOwned { name: card.name }.into());
            }
        }
        if held < quantity {
            return Err(Rejection::InsufficientQuantity {
                owner: collection::mention(owner_id),
                name: card.name,
                available: held,
                requested: quantity,
            }
            .into());
        }

        let pledged = pledged_units(db, owner_id, card.card_ref).await?;
        if held - pledged < quantity {
            return Err(Rejection::AlreadyPledged { name: card.name }.into());
        }

        lines.push(TradeLine { card, quantity });
    }
    Ok(lines)
}

/// Proposes a trade.
///
/// The rate limiter is consulted first. An attempt it allows is recorded even
/// if validation later rejects the offer.
///
/// # Errors
/// Returns a rejection if:
/// - The initiator has made too many offers recently
/// - The initiator targets themself
/// - Either side is empty or holds more than `max_cards_per_side` units,
///   including any single line above that limit
/// - Either party lacks a card in sufficient regular (non-special) quantity
/// - A card is already pledged to another pending trade by the same user
#[instrument(skip(db, limiter, config))]
pub async fn offer_trade<L>(
    db: &DatabaseConnection,
    limiter: &L,
    config: &TradeConfig,
    request: TradeRequest<'_>,
    now: DateTime<Utc>,
) -> Result<TradeDetails>
where
    L: RateLimiter,
{
    if let RateDecision::Limited { seconds_left } =
        limiter.check_and_record(request.initiator_id, now).await?
    {
        return Err(Rejection::RateLimited { seconds_left }.into());
    }

    if request.initiator_id == request.target_id {
        return Err(Rejection::SelfTarget.into());
    }

    let offered_names = parse_card_list(request.offered);
    let requested_names = parse_card_list(request.requested);
    if offered_names.is_empty() || requested_names.is_empty() {
        return Err(Rejection::EmptyTrade.into());
    }
    let max = config.max_cards_per_side;
    if exceeds_side_limit(&offered_names, max) || exceeds_side_limit(&requested_names, max) {
        return Err(Rejection::TooManyCards { max }.into());
    }

    let txn = db.begin().await?;
    let offered = validate_side(&txn, request.initiator_id, true, &offered_names).await?;
    let requested = validate_side(&txn, request.target_id, false, &requested_names).await?;

    let trade = trade::ActiveModel {
        id: Set(uuid7::uuid7().to_string()),
        initiator_id: Set(request.initiator_id.to_string()),
        target_id: Set(request.target_id.to_string()),
        status: Set(TradeStatus::Pending),
        created_at: Set(now),
        completed_at: Set(None),
        cancelled_at: Set(None),
        cancelled_by: Set(None),
    }
    .insert(&txn)
    .await?;

    let sides = [(TradeSide::Offered, &offered), (TradeSide::Requested, &requested)];
    for (side, lines) in sides {
        for line in lines {
            trade_item::ActiveModel {
                trade_id: Set(trade.id.clone()),
                side: Set(side),
                card_kind: Set(line.card.card_ref.kind()),
                card_id: Set(line.card.card_ref.id()),
                quantity: Set(line.quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }
    txn.commit().await?;

    info!(trade_id = %trade.id, initiator = request.initiator_id, target = request.target_id, "Trade offered");
    Ok(TradeDetails {
        trade,
        offered,
        requested,
    })
}

/// Loads a trade's lines and resolves their cards.
pub async fn load_details<C>(db: &C, trade: trade::Model) -> Result<TradeDetails>
where
    C: ConnectionTrait,
{
    let items = TradeItem::find()
        .filter(trade_item::Column::TradeId.eq(trade.id.clone()))
        .order_by_asc(trade_item::Column::Id)
        .all(db)
        .await?;

    let mut offered = Vec::new();
    let mut requested = Vec::new();
    for item in items {
        let card = catalog::require(db, CardRef::new(item.card_kind, item.card_id)).await?;
        let line = TradeLine {
            card,
            quantity: item.quantity,
        };
        match item.side {
            TradeSide::Offered => offered.push(line),
            TradeSide::Requested => requested.push(line),
        }
    }

    Ok(TradeDetails {
        trade,
        offered,
        requested,
    })
}

/// Moves a pending trade to a terminal status, only if it is still pending.
async fn close_trade<C>(
    db: &C,
    trade_id: &str,
    status: TradeStatus,
    actor: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut update = Trade::update_many().col_expr(trade::Column::Status, Expr::value(status));
    update = match status {
        TradeStatus::Completed => update.col_expr(trade::Column::CompletedAt, Expr::value(Some(now))),
        _ => update
            .col_expr(trade::Column::CancelledAt, Expr::value(Some(now)))
            .col_expr(
                trade::Column::CancelledBy,
                Expr::value(actor.map(ToString::to_string)),
            ),
    };

    let result = update
        .filter(trade::Column::Id.eq(trade_id))
        .filter(trade::Column::Status.eq(TradeStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn still_available<C>(db: &C, owner_id: &str, lines: &[TradeLine]) -> Result<bool>
where
    C: ConnectionTrait,
{
    for line in lines {
        if collection::quantity_of(db, owner_id, line.card.card_ref, false).await? < line.quantity {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Accepts a pending trade on behalf of its target and performs the exchange.
///
/// All four collection movements and the status change commit together or not at
/// all. If either party no longer holds their cards the trade is cancelled (with
/// the accepter recorded) and `Rejection::TradeNoLongerValid` is returned.
#[instrument(skip(db))]
pub async fn accept_trade(
    db: &DatabaseConnection,
    trade_id: &str,
    accepter_id: &str,
    now: DateTime<Utc>,
) -> Result<TradeDetails> {
    let txn = db.begin().await?;
    let trade = Trade::find_by_id(trade_id.to_string())
        .one(&txn)
        .await?
        .filter(|trade| trade.status == TradeStatus::Pending)
        .ok_or(Rejection::TradeNotFound)?;
    if trade.target_id != accepter_id {
        return Err(Rejection::NotTradeTarget.into());
    }

    let details = load_details(&txn, trade).await?;
    let initiator_id = details.trade.initiator_id.clone();
    let target_id = details.trade.target_id.clone();

    if !still_available(&txn, &initiator_id, &details.offered).await?
        || !still_available(&txn, &target_id, &details.requested).await?
    {
        close_trade(&txn, trade_id, TradeStatus::Cancelled, Some(accepter_id), now).await?;
        txn.commit().await?;
        warn!(trade_id, "Trade auto-cancelled: cards no longer available");
        return Err(Rejection::TradeNoLongerValid.into());
    }

    for line in &details.offered {
        collection::remove_units(&txn, &initiator_id, line.card.card_ref, false, line.quantity).await?;
        collection::add_units(&txn, &target_id, line.card.card_ref, false, line.quantity).await?;
    }
    for line in &details.requested {
        collection::remove_units(&txn, &target_id, line.card.card_ref, false, line.quantity).await?;
        collection::add_units(&txn, &initiator_id, line.card.card_ref, false, line.quantity).await?;
    }

    if !close_trade(&txn, trade_id, TradeStatus::Completed, None, now).await? {
        return Err(Rejection::TradeNotFound.into());
    }
    txn.commit().await?;

    info!(trade_id, initiator = %initiator_id, target = %target_id, "Trade completed");
    let trade = Trade::find_by_id(trade_id.to_string())
        .one(db)
        .await?
        .ok_or(Rejection::TradeNotFound)?;
    Ok(TradeDetails { trade, ..details })
}

/// Cancels a pending trade on behalf of either party.
#[instrument(skip(db))]
pub async fn cancel_trade(
    db: &DatabaseConnection,
    trade_id: &str,
    canceller_id: &str,
    now: DateTime<Utc>,
) -> Result<trade::Model> {
    let trade = Trade::find_by_id(trade_id.to_string())
        .one(db)
        .await?
        .filter(|trade| trade.status == TradeStatus::Pending)
        .ok_or(Rejection::TradeNotFound)?;
    if trade.initiator_id != canceller_id && trade.target_id != canceller_id {
        return Err(Rejection::NotTradeParty.into());
    }

    if !close_trade(db, trade_id, TradeStatus::Cancelled, Some(canceller_id), now).await? {
        return Err(Rejection::TradeNotFound.into());
    }
    info!(trade_id, canceller_id, "Trade cancelled");

    Trade::find_by_id(trade_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Rejection::TradeNotFound.into())
}

/// Pending trades a user is a party to, oldest first.
pub async fn pending_trades_for(db: &DatabaseConnection, user_id: &str) -> Result<Vec<TradeDetails>> {
    let trades = Trade::find()
        .filter(trade::Column::Status.eq(TradeStatus::Pending))
        .filter(
            Condition::any()
                .add(trade::Column::InitiatorId.eq(user_id))
                .add(trade::Column::TargetId.eq(user_id)),
        )
        .order_by_asc(trade::Column::CreatedAt)
        .all(db)
        .await?;

    let mut details = Vec::with_capacity(trades.len());
    for trade in trades {
        details.push(load_details(db, trade).await?);
    }
    Ok(details)
}

/// Cancels every pending trade created more than `ttl` before `now`.
///
/// Returns the number of trades expired.
pub async fn expire_stale_trades(db: &DatabaseConnection, ttl: Duration, now: DateTime<Utc>) -> Result<u64> {
    let pending = Trade::find()
        .filter(trade::Column::Status.eq(TradeStatus::Pending))
        .all(db)
        .await?;

    let mut expired = 0;
    for trade in pending.into_iter().filter(|trade| trade.created_at + ttl <= now) {
        if close_trade(db, &trade.id, TradeStatus::Cancelled, None, now).await? {
            expired += 1;
        }
    }
    if expired > 0 {
        info!(expired, "Expired stale trades");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::rate_limit::{MemoryRateLimiter, RateWindow};
    use crate::entities::Rarity;
    use crate::test_utils::*;

    fn limiter() -> MemoryRateLimiter {
        MemoryRateLimiter::new(RateWindow::from(&TradeConfig::default()))
    }

    fn request<'a>(offered: &'a str, requested: &'a str) -> TradeRequest<'a> {
        TradeRequest {
            initiator_id: "alice",
            target_id: "bob",
            offered,
            requested,
        }
    }

    async fn units(db: &DatabaseConnection, user: &str, card: &crate::entities::CardModel) -> Result<i64> {
        collection::quantity_of(db, user, CardRef::Card(card.id), false).await
    }

    #[test]
    fn test_parse_card_list() {
        assert_eq!(
            parse_card_list("Ember Fox x2, Ash Owl , 3x Tide Oracle,,"),
            vec![
                ("Ember Fox".to_string(), 2),
                ("Ash Owl".to_string(), 1),
                ("Tide Oracle".to_string(), 3),
            ]
        );
        assert_eq!(
            parse_card_list("Ember Fox, ember fox x2"),
            vec![("Ember Fox".to_string(), 3)]
        );
        // Words that merely start with x are part of the name
        assert_eq!(parse_card_list("Xeno Drake"), vec![("Xeno Drake".to_string(), 1)]);
        assert!(parse_card_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_card_list_saturates_huge_quantities() {
        assert_eq!(
            parse_card_list("Ember Fox x9223372036854775807, ember fox x1"),
            vec![("Ember Fox".to_string(), i64::MAX)]
        );
        assert!(exceeds_side_limit(&parse_card_list("Ember Fox x11"), 10));
        assert!(!exceeds_side_limit(&parse_card_list("Ember Fox x4, Ash Owl x6"), 10));
    }

    #[tokio::test]
    async fn test_huge_quantities_are_rejected_and_not_persisted() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 2).await?;
        give_card(&db, "alice", &owl, 2).await?;
        give_card(&db, "bob", &owl, 1).await?;
        let config = TradeConfig::default();

        for offered in [
            "Ember Fox x9223372036854775807, Ash Owl x9223372036854775807",
            "Ember Fox x9223372036854775807, ember fox x2",
            "Ember Fox x4611686018427387904, Ash Owl x4611686018427387904",
        ] {
            let err = offer_trade(&db, &limiter(), &config, request(offered, "Ash Owl"), Utc::now())
                .await
                .unwrap_err();
            assert_eq!(err.as_rejection(), Some(&Rejection::TooManyCards { max: 10 }));
        }
        assert!(Trade::find().all(&db).await?.is_empty());
        assert!(TradeItem::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_offer_more_than_owned_is_rejected_and_not_persisted() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 2).await?;
        give_card(&db, "bob", &owl, 1).await?;

        let err = offer_trade(
            &db,
            &limiter(),
            &TradeConfig::default(),
            request("Ember Fox x3", "Ash Owl"),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.as_rejection(),
            Some(&Rejection::InsufficientQuantity {
                owner: "<@alice>".to_string(),
                name: "Ember Fox".to_string(),
                available: 2,
                requested: 3,
            })
        );
        assert!(Trade::find().all(&db).await?.is_empty());
        assert!(TradeItem::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_offer_validation_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        let gem = create_test_card(&db, "Star Gem", Rarity::Rare, 60).await?;
        give_card(&db, "alice", &fox, 20).await?;
        give_special_card(&db, "alice", &gem, 1).await?;
        give_card(&db, "bob", &owl, 1).await?;
        let config = TradeConfig::default();
        let now = Utc::now();
        let rejection = |result: Result<TradeDetails>| result.unwrap_err().as_rejection().cloned();

        let mut to_self = request("Ember Fox", "Ember Fox");
        to_self.target_id = "alice";
        assert_eq!(
            rejection(offer_trade(&db, &limiter(), &config, to_self, now).await),
            Some(Rejection::SelfTarget)
        );
        assert_eq!(
            rejection(offer_trade(&db, &limiter(), &config, request("Ember Fox x11", "Ash Owl"), now).await),
            Some(Rejection::TooManyCards { max: 10 })
        );
        assert_eq!(
            rejection(offer_trade(&db, &limiter(), &config, request("", "Ash Owl"), now).await),
            Some(Rejection::EmptyTrade)
        );
        assert_eq!(
            rejection(offer_trade(&db, &limiter(), &config, request("Star Gem", "Ash Owl"), now).await),
            Some(Rejection::SpecialCardUntradeable {
                name: "Star Gem".to_string()
            })
        );
        assert_eq!(
            rejection(offer_trade(&db, &limiter(), &config, request("Ash Owl", "Ember Fox"), now).await),
            Some(Rejection::CardNotOwned {
                name: "Ash Owl".to_string()
            })
        );
        assert!(matches!(
            rejection(offer_trade(&db, &limiter(), &config, request("Ember Fox", "Ash Owl x2"), now).await),
            Some(Rejection::InsufficientQuantity { available: 1, requested: 2, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_pledged_cards_cannot_be_offered_twice() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 3).await?;
        give_card(&db, "bob", &owl, 2).await?;
        give_card(&db, "carol", &owl, 2).await?;
        let config = TradeConfig::default();
        let limiter = limiter();
        let now = Utc::now();

        offer_trade(&db, &limiter, &config, request("Ember Fox x2", "Ash Owl"), now).await?;

        // One unpledged copy remains
        let mut to_carol = request("Ember Fox", "Ash Owl");
        to_carol.target_id = "carol";
        offer_trade(&db, &limiter, &config, to_carol, now).await?;

        let err = offer_trade(&db, &limiter, &config, to_carol, now).await.unwrap_err();
        assert_eq!(
            err.as_rejection(),
            Some(&Rejection::AlreadyPledged {
                name: "Ember Fox".to_string()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_offers_are_rate_limited() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 10).await?;
        give_card(&db, "bob", &owl, 10).await?;
        let config = TradeConfig::default();
        let limiter = limiter();
        let now = Utc::now();

        for _ in 0..3 {
            offer_trade(&db, &limiter, &config, request("Ember Fox", "Ash Owl"), now).await?;
        }
        let err = offer_trade(&db, &limiter, &config, request("Ember Fox", "Ash Owl"), now)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_rejection(),
            Some(&Rejection::RateLimited { seconds_left: 60 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_exchanges_all_four_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 3).await?;
        give_card(&db, "bob", &owl, 2).await?;
        give_card(&db, "bob", &fox, 1).await?;

        let offer = offer_trade(
            &db,
            &limiter(),
            &TradeConfig::default(),
            request("Ember Fox x2", "Ash Owl x2"),
            Utc::now(),
        )
        .await?;

        let err = accept_trade(&db, &offer.trade.id, "alice", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.as_rejection(), Some(&Rejection::NotTradeTarget));

        let done = accept_trade(&db, &offer.trade.id, "bob", Utc::now()).await?;
        assert_eq!(done.trade.status, TradeStatus::Completed);
        assert!(done.trade.completed_at.is_some());

        assert_eq!(units(&db, "alice", &fox).await?, 1);
        assert_eq!(units(&db, "bob", &fox).await?, 3);
        assert_eq!(units(&db, "bob", &owl).await?, 0);
        assert_eq!(units(&db, "alice", &owl).await?, 2);

        let again = accept_trade(&db, &offer.trade.id, "bob", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(again.as_rejection(), Some(&Rejection::TradeNotFound));
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_cancels_when_cards_are_gone() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 1).await?;
        give_card(&db, "bob", &owl, 1).await?;

        let offer = offer_trade(
            &db,
            &limiter(),
            &TradeConfig::default(),
            request("Ember Fox", "Ash Owl"),
            Utc::now(),
        )
        .await?;
        // Bob loses the owl before accepting
        collection::remove_units(&db, "bob", CardRef::Card(owl.id), false, 1).await?;

        let err = accept_trade(&db, &offer.trade.id, "bob", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.as_rejection(), Some(&Rejection::TradeNoLongerValid));

        let stored = Trade::find_by_id(offer.trade.id.clone()).one(&db).await?.unwrap();
        assert_eq!(stored.status, TradeStatus::Cancelled);
        assert_eq!(stored.cancelled_by.as_deref(), Some("bob"));
        assert_eq!(units(&db, "alice", &fox).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_is_all_or_nothing_under_failure() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 2).await?;
        give_card(&db, "bob", &owl, 2).await?;

        let offer = offer_trade(
            &db,
            &limiter(),
            &TradeConfig::default(),
            request("Ember Fox", "Ash Owl"),
            Utc::now(),
        )
        .await?;

        // Fail the final status update, after every collection write has run
        db.execute_unprepared(
            "CREATE TRIGGER fail_trade_completion BEFORE UPDATE ON trades \
             WHEN NEW.status = 'completed' \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        )
        .await?;

        assert!(accept_trade(&db, &offer.trade.id, "bob", Utc::now()).await.is_err());

        assert_eq!(units(&db, "alice", &fox).await?, 2);
        assert_eq!(units(&db, "bob", &fox).await?, 0);
        assert_eq!(units(&db, "bob", &owl).await?, 2);
        assert_eq!(units(&db, "alice", &owl).await?, 0);
        let stored = Trade::find_by_id(offer.trade.id.clone()).one(&db).await?.unwrap();
        assert_eq!(stored.status, TradeStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_and_expiry() -> Result<()> {
        let db = setup_test_db().await?;
        let fox = create_test_card(&db, "Ember Fox", Rarity::Common, 50).await?;
        let owl = create_test_card(&db, "Ash Owl", Rarity::Common, 45).await?;
        give_card(&db, "alice", &fox, 5).await?;
        give_card(&db, "bob", &owl, 5).await?;
        let config = TradeConfig::default();
        let limiter = limiter();
        let start = Utc::now();

        let first = offer_trade(&db, &limiter, &config, request("Ember Fox", "Ash Owl"), start).await?;
        let second = offer_trade(&db, &limiter, &config, request("Ember Fox", "Ash Owl"), start).await?;
        assert_eq!(pending_trades_for(&db, "bob").await?.len(), 2);

        let err = cancel_trade(&db, &first.trade.id, "mallory", start).await.unwrap_err();
        assert_eq!(err.as_rejection(), Some(&Rejection::NotTradeParty));

        let cancelled = cancel_trade(&db, &first.trade.id, "bob", start).await?;
        assert_eq!(cancelled.status, TradeStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by.as_deref(), Some("bob"));

        let ttl = Duration::hours(config.pending_ttl_hours);
        assert_eq!(expire_stale_trades(&db, ttl, start + Duration::hours(1)).await?, 0);
        assert_eq!(expire_stale_trades(&db, ttl, start + ttl).await?, 1);
        assert!(pending_trades_for(&db, "alice").await?.is_empty());

        let err = accept_trade(&db, &second.trade.id, "bob", start).await.unwrap_err();
        assert_eq!(err.as_rejection(), Some(&Rejection::TradeNotFound));
        Ok(())
    }
}
