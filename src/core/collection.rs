//! Collection business logic - Which cards each user holds, and how many.
//!
//! A collection entry is keyed by `(user, card reference, special)`. Quantity
//! changes go through [`add_units`] and [`remove_units`], which update the row
//! with a single atomic `quantity = quantity ± n` statement so concurrent callers
//! cannot lose updates. An entry whose quantity reaches zero is deleted.

use crate::{
    core::catalog::{self, CardRef, CardView},
    entities::{Card, CollectionEntry, FusedCard, Rarity, collection_entry},
    errors::{Error, Rejection, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{Set, prelude::*};
use std::collections::HashMap;
use tracing::{info, instrument};

/// A collection entry together with the card it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCard {
    pub entry: collection_entry::Model,
    pub card: CardView,
}

impl OwnedCard {
    #[must_use]
    pub const fn card_ref(&self) -> CardRef {
        self.card.card_ref
    }

    #[must_use]
    pub const fn special(&self) -> bool {
        self.entry.special
    }

    #[must_use]
    pub const fn quantity(&self) -> i64 {
        self.entry.quantity
    }
}

/// Discord mention for a user id, used when naming the owner in a rejection.
#[must_use]
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Finds the entry for one lineage (regular or special) of a card.
pub async fn find_entry<C>(
    db: &C,
    user_id: &str,
    card_ref: CardRef,
    special: bool,
) -> Result<Option<collection_entry::Model>>
where
    C: ConnectionTrait,
{
    CollectionEntry::find()
        .filter(collection_entry::Column::UserId.eq(user_id))
        .filter(collection_entry::Column::CardKind.eq(card_ref.kind()))
        .filter(collection_entry::Column::CardId.eq(card_ref.id()))
        .filter(collection_entry::Column::Special.eq(special))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Copies of one lineage a user holds; zero when there is no entry.
pub async fn quantity_of<C>(db: &C, user_id: &str, card_ref: CardRef, special: bool) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(find_entry(db, user_id, card_ref, special)
        .await?
        .map_or(0, |entry| entry.quantity))
}

/// Adds `quantity` copies to a user's collection, creating the entry if needed.
///
/// # Errors
/// Returns `Rejection::NonPositiveAmount` if `quantity` is not positive, or an
/// error if the database operation fails.
pub async fn add_units<C>(
    db: &C,
    user_id: &str,
    card_ref: CardRef,
    special: bool,
    quantity: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if quantity <= 0 {
        return Err(Rejection::NonPositiveAmount.into());
    }

    if let Some(entry) = find_entry(db, user_id, card_ref, special).await? {
        CollectionEntry::update_many()
            .col_expr(
                collection_entry::Column::Quantity,
                Expr::col(collection_entry::Column::Quantity).add(quantity),
            )
            .filter(collection_entry::Column::Id.eq(entry.id))
            .exec(db)
            .await?;
    } else {
        let entry = collection_entry::ActiveModel {
            user_id: Set(user_id.to_string()),
            card_kind: Set(card_ref.kind()),
            card_id: Set(card_ref.id()),
            quantity: Set(quantity),
            special: Set(special),
            ..Default::default()
        };
        entry.insert(db).await?;
    }

    Ok(())
}

/// Removes `quantity` copies from a user's collection.
///
/// The decrement only applies if enough copies are held; the entry is deleted
/// when its quantity reaches zero.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is not positive
/// - The user holds fewer than `quantity` copies of that lineage
/// - The database operation fails
pub async fn remove_units<C>(
    db: &C,
    user_id: &str,
    card_ref: CardRef,
    special: bool,
    quantity: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if quantity <= 0 {
        return Err(Rejection::NonPositiveAmount.into());
    }

    let entry = find_entry(db, user_id, card_ref, special).await?;
    let updated = match &entry {
        Some(entry) => {
            CollectionEntry::update_many()
                .col_expr(
                    collection_entry::Column::Quantity,
                    Expr::col(collection_entry::Column::Quantity).sub(quantity),
                )
                .filter(collection_entry::Column::Id.eq(entry.id))
                .filter(collection_entry::Column::Quantity.gte(quantity))
                .exec(db)
                .await?
                .rows_affected
        }
        None => 0,
    };

    if updated == 0 {
        let name = catalog::resolve(db, card_ref)
            .await?
            .map_or_else(|| card_ref.to_string(), |card| card.name);
        return Err(Rejection::InsufficientQuantity {
            owner: mention(user_id),
            name,
            available: entry.map_or(0, |entry| entry.quantity),
            requested: quantity,
        }
        .into());
    }

    CollectionEntry::delete_many()
        .filter(collection_entry::Column::UserId.eq(user_id))
        .filter(collection_entry::Column::Quantity.lte(0))
        .exec(db)
        .await?;

    Ok(())
}

/// All of a user's entries with their cards resolved, strongest rarity first.
///
/// Entries pointing at cards that no longer exist are skipped.
pub async fn get_collection<C>(db: &C, user_id: &str) -> Result<Vec<OwnedCard>>
where
    C: ConnectionTrait,
{
    let entries = CollectionEntry::find()
        .filter(collection_entry::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut card_ids = Vec::new();
    let mut fused_ids = Vec::new();
    for entry in &entries {
        match CardRef::new(entry.card_kind, entry.card_id) {
            CardRef::Card(id) => card_ids.push(id),
            CardRef::Fused(id) => fused_ids.push(id),
        }
    }

    let mut views: HashMap<CardRef, CardView> = HashMap::new();
    if !card_ids.is_empty() {
        for card in Card::find()
            .filter(crate::entities::card::Column::Id.is_in(card_ids))
            .all(db)
            .await?
        {
            let view = CardView::from(card);
            views.insert(view.card_ref, view);
        }
    }
    if !fused_ids.is_empty() {
        for card in FusedCard::find()
            .filter(crate::entities::fused_card::Column::Id.is_in(fused_ids))
            .all(db)
            .await?
        {
            let view = CardView::from(card);
            views.insert(view.card_ref, view);
        }
    }

    let mut owned: Vec<OwnedCard> = entries
        .into_iter()
        .filter_map(|entry| {
            let card = views.get(&CardRef::new(entry.card_kind, entry.card_id))?.clone();
            Some(OwnedCard { entry, card })
        })
        .collect();

    owned.sort_by(|a, b| {
        b.card
            .rarity
            .cmp(&a.card.rarity)
            .then_with(|| a.card.name.cmp(&b.card.name))
            .then_with(|| a.entry.special.cmp(&b.entry.special))
    });
    Ok(owned)
}

/// Finds the entry a user holds for a card named `name` (ignoring case).
///
/// When both lineages are held, the regular one is preferred.
pub async fn find_owned_by_name<C>(db: &C, user_id: &str, name: &str) -> Result<Option<OwnedCard>>
where
    C: ConnectionTrait,
{
    let wanted = name.trim().to_lowercase();
    let best = get_collection(db, user_id)
        .await?
        .into_iter()
        .filter(|owned| owned.card.name.to_lowercase() == wanted)
        .min_by_key(|owned| (owned.entry.special, -owned.entry.quantity));
    Ok(best)
}

/// Optional narrowing of a collection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    pub rarity: Option<Rarity>,
    /// Set label, compared ignoring case
    pub set_name: Option<String>,
}

impl CollectionFilter {
    #[must_use]
    pub fn matches(&self, card: &CardView) -> bool {
        let rarity_ok = self.rarity.is_none_or(|rarity| card.rarity == rarity);
        let set_ok = self
            .set_name
            .as_deref()
            .map(str::trim)
            .is_none_or(|set| card.set_name.eq_ignore_ascii_case(set));
        rarity_ok && set_ok
    }
}

/// A user's collection narrowed by `filter`, in [`get_collection`] order.
pub async fn get_filtered_collection<C>(
    db: &C,
    user_id: &str,
    filter: &CollectionFilter,
) -> Result<Vec<OwnedCard>>
where
    C: ConnectionTrait,
{
    let mut owned = get_collection(db, user_id).await?;
    owned.retain(|entry| filter.matches(&entry.card));
    Ok(owned)
}

/// Where a fused card came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionOrigin {
    /// Parent cards still in the catalog
    pub parents: Vec<CardView>,
    pub parent_quantity: i64,
    pub fused_by: String,
}

/// One owned card with everything the detailed view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub owned: OwnedCard,
    pub origin: Option<FusionOrigin>,
}

/// Looks up an owned card by name for a detailed view.
///
/// # Errors
/// Returns `Rejection::CardNotOwned` if the user holds no card with that name.
pub async fn inspect_card<C>(db: &C, user_id: &str, name: &str) -> Result<CardDetails>
where
    C: ConnectionTrait,
{
    let owned = find_owned_by_name(db, user_id, name)
        .await?
        .ok_or_else(|| Rejection::CardNotOwned {
            name: name.trim().to_string(),
        })?;

    let origin = match owned.card_ref() {
        CardRef::Card(_) => None,
        CardRef::Fused(id) => match FusedCard::find_by_id(id).one(db).await? {
            Some(fused) => {
                let mut parents = Vec::with_capacity(2);
                for parent_id in [fused.parent_a_id, fused.parent_b_id] {
                    if let Some(parent) = catalog::resolve(db, CardRef::Card(parent_id)).await? {
                        parents.push(parent);
                    }
                }
                Some(FusionOrigin {
                    parents,
                    parent_quantity: fused.parent_quantity,
                    fused_by: fused.fused_by,
                })
            }
            None => None,
        },
    };
    Ok(CardDetails { owned, origin })
}

/// Total number of card units a user holds across all entries.
pub async fn total_units<C>(db: &C, user_id: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(CollectionEntry::find()
        .filter(collection_entry::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .iter()
        .map(|entry| entry.quantity)
        .sum())
}

/// Admin grant of regular copies of a catalog or fused card, looked up by name.
///
/// # Errors
/// Returns `Error::CardNotFound` if no card has that name, or
/// `Rejection::NonPositiveAmount` if `quantity` is not positive.
#[instrument(skip(db))]
pub async fn give_card(
    db: &DatabaseConnection,
    user_id: &str,
    card_name: &str,
    quantity: i64,
) -> Result<CardView> {
    let card = catalog::find_card_by_name(db, card_name)
        .await?
        .ok_or_else(|| Error::CardNotFound {
            name: card_name.to_string(),
        })?;
    add_units(db, user_id, card.card_ref, false, quantity).await?;
    info!(user_id, card = %card.name, quantity, "Granted cards");
    Ok(card)
}
