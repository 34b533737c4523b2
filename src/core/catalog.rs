//! Card catalog business logic - Regular and fused card lookup and creation.
//!
//! Collection entries, battles and trade lines all point at a card through a
//! [`CardRef`], a tagged reference into either the `cards` table or the
//! `fused_cards` table. This module resolves those references into a uniform
//! [`CardView`] and owns the rules for adding cards to the catalog.

use crate::{
    config::game::CardSeed,
    core::resolver::Combatant,
    entities::{Card, CardKind, Element, FusedCard, Rarity, card, fused_card},
    errors::{Error, Rejection, Result},
};
use rand::Rng;
use rand::seq::IndexedRandom;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::fmt;
use tracing::{debug, info};

/// A reference to either a regular catalog card or a fused card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardRef {
    Card(i64),
    Fused(i64),
}

impl CardRef {
    /// Rebuilds a reference from its persisted `(kind, id)` pair.
    #[must_use]
    pub const fn new(kind: CardKind, id: i64) -> Self {
        match kind {
            CardKind::Card => Self::Card(id),
            CardKind::Fused => Self::Fused(id),
        }
    }

    #[must_use]
    pub const fn kind(self) -> CardKind {
        match self {
            Self::Card(_) => CardKind::Card,
            Self::Fused(_) => CardKind::Fused,
        }
    }

    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Card(id) | Self::Fused(id) => id,
        }
    }
}

impl fmt::Display for CardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(id) => write!(f, "card #{id}"),
            Self::Fused(id) => write!(f, "fused card #{id}"),
        }
    }
}

/// A resolved card, regular or fused, with everything needed for display and battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub card_ref: CardRef,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub element: Option<Element>,
    pub set_name: String,
    pub image_url: Option<String>,
    pub power: i64,
}

impl CardView {
    /// The battle-relevant view of one copy of this card.
    #[must_use]
    pub const fn combatant(&self, special: bool) -> Combatant {
        Combatant {
            rarity: self.rarity,
            element: self.element,
            power: self.power,
            special,
        }
    }

    /// Name shown to users, with the special prefix for special copies.
    #[must_use]
    pub fn display_name(&self, special: bool, special_prefix: Option<&str>) -> String {
        match special_prefix {
            Some(prefix) if special && !prefix.trim().is_empty() => {
                format!("{} {}", prefix.trim(), self.name)
            }
            _ if special => format!("{} ★", self.name),
            _ => self.name.clone(),
        }
    }
}

impl From<card::Model> for CardView {
    fn from(card: card::Model) -> Self {
        Self {
            card_ref: CardRef::Card(card.id),
            name: card.name,
            description: card.description,
            rarity: card.rarity,
            element: card.element,
            set_name: card.set_name,
            image_url: card.image_url,
            power: card.power,
        }
    }
}

impl From<fused_card::Model> for CardView {
    fn from(card: fused_card::Model) -> Self {
        Self {
            card_ref: CardRef::Fused(card.id),
            name: card.name,
            description: card.description,
            rarity: Rarity::Fused,
            element: None,
            set_name: card.set_name,
            image_url: card.image_url,
            power: card.power,
        }
    }
}

/// Input for adding a regular card to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub element: Option<Element>,
    pub set_name: String,
    pub image_url: Option<String>,
    pub power: i64,
}

impl NewCard {
    /// Checks the catalog rules that do not need the database.
    ///
    /// # Errors
    /// Returns `Rejection::InvalidCard` if:
    /// - The name is empty or whitespace-only
    /// - The power is negative
    /// - The rarity is `fused` (fused cards only come from fusion)
    /// - A deity card lacks the Deity element, or a non-deity card carries it
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Rejection::InvalidCard {
                reason: reason.to_string(),
            }
            .into())
        };

        if self.name.trim().is_empty() {
            return invalid("name cannot be empty");
        }
        if self.power < 0 {
            return invalid("power cannot be negative");
        }
        if self.rarity == Rarity::Fused {
            return invalid("fused cards can only be created by fusion");
        }
        match (self.rarity, self.element) {
            (Rarity::Deity, Some(Element::Deity)) => Ok(()),
            (Rarity::Deity, _) => invalid("deity cards must have the Deity element"),
            (_, Some(Element::Deity)) => invalid("only deity cards may have the Deity element"),
            _ => Ok(()),
        }
    }
}

impl From<&CardSeed> for NewCard {
    fn from(seed: &CardSeed) -> Self {
        Self {
            name: seed.name.clone(),
            description: seed.description.clone(),
            rarity: seed.rarity,
            element: seed.element,
            set_name: seed.set_name.clone(),
            image_url: seed.image_url.clone(),
            power: seed.power,
        }
    }
}

/// Adds a regular card to the catalog.
///
/// # Errors
/// Returns an error if:
/// - The definition fails [`NewCard::validate`]
/// - A card with the same name (ignoring case) already exists
/// - The database insert fails
pub async fn create_card<C>(db: &C, new_card: NewCard) -> Result<card::Model>
where
    C: ConnectionTrait,
{
    new_card.validate()?;
    let name = new_card.name.trim().to_string();

    if get_card_by_name(db, &name).await?.is_some() {
        return Err(Rejection::DuplicateCard { name }.into());
    }

    let card = card::ActiveModel {
        name: Set(name),
        description: Set(new_card.description),
        rarity: Set(new_card.rarity),
        element: Set(new_card.element),
        set_name: Set(new_card.set_name),
        image_url: Set(new_card.image_url),
        power: Set(new_card.power),
        ..Default::default()
    };
    let card = card.insert(db).await?;
    info!(card_id = card.id, name = %card.name, rarity = %card.rarity, "Created card");
    Ok(card)
}

/// Finds a regular card by name, ignoring case.
pub async fn get_card_by_name<C>(db: &C, name: &str) -> Result<Option<card::Model>>
where
    C: ConnectionTrait,
{
    Card::find()
        .filter(Expr::expr(Func::lower(Expr::col(card::Column::Name))).eq(name.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a regular card, or failing that a fused card, by name (ignoring case).
pub async fn find_card_by_name<C>(db: &C, name: &str) -> Result<Option<CardView>>
where
    C: ConnectionTrait,
{
    if let Some(card) = get_card_by_name(db, name).await? {
        return Ok(Some(card.into()));
    }

    let fused = FusedCard::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(fused_card::Column::Name)))
                .eq(name.trim().to_lowercase()),
        )
        .order_by_asc(fused_card::Column::Id)
        .one(db)
        .await?;
    Ok(fused.map(Into::into))
}

/// Resolves a card reference, returning `None` if it no longer exists.
pub async fn resolve<C>(db: &C, card_ref: CardRef) -> Result<Option<CardView>>
where
    C: ConnectionTrait,
{
    let view = match card_ref {
        CardRef::Card(id) => Card::find_by_id(id).one(db).await?.map(Into::into),
        CardRef::Fused(id) => FusedCard::find_by_id(id).one(db).await?.map(Into::into),
    };
    Ok(view)
}

/// Resolves a card reference that must exist.
///
/// # Errors
/// Returns `Error::CardNotFound` if the referenced card is missing.
pub async fn require<C>(db: &C, card_ref: CardRef) -> Result<CardView>
where
    C: ConnectionTrait,
{
    resolve(db, card_ref).await?.ok_or_else(|| Error::CardNotFound {
        name: card_ref.to_string(),
    })
}

/// All regular cards of one rarity, ordered by name.
pub async fn cards_of_rarity<C>(db: &C, rarity: Rarity) -> Result<Vec<card::Model>>
where
    C: ConnectionTrait,
{
    Card::find()
        .filter(card::Column::Rarity.eq(rarity))
        .order_by_asc(card::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Picks a uniformly random regular card of one rarity.
///
/// # Errors
/// Returns `Rejection::EmptyRarityPool` if the catalog has no card of that rarity.
pub async fn random_card_of_rarity<C, R>(db: &C, rng: &mut R, rarity: Rarity) -> Result<card::Model>
where
    C: ConnectionTrait,
    R: Rng + Send + ?Sized,
{
    let pool = cards_of_rarity(db, rarity).await?;
    pool.choose(rng).cloned().ok_or_else(|| {
        Rejection::EmptyRarityPool {
            rarity: rarity.to_string(),
        }
        .into()
    })
}

/// Inserts every seed card whose name is not in the catalog yet.
///
/// Returns the number of cards inserted. Invalid seeds abort the seeding.
pub async fn seed_catalog<C>(db: &C, seeds: &[CardSeed]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut inserted = 0;
    for seed in seeds {
        if get_card_by_name(db, &seed.name).await?.is_some() {
            debug!("Seed card {} already present", seed.name);
            continue;
        }
        create_card(db, NewCard::from(seed)).await?;
        inserted += 1;
    }

    if inserted > 0 {
        info!("Seeded {inserted} catalog cards");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn new_card(name: &str, rarity: Rarity, element: Option<Element>) -> NewCard {
        NewCard {
            name: name.to_string(),
            description: "test".to_string(),
            rarity,
            element,
            set_name: "Base".to_string(),
            image_url: None,
            power: 10,
        }
    }

    #[test]
    fn test_card_ref_round_trips_kind() {
        let fused = CardRef::new(CardKind::Fused, 4);
        assert_eq!(fused, CardRef::Fused(4));
        assert_eq!(fused.kind(), CardKind::Fused);
        assert_eq!(fused.id(), 4);
        assert_eq!(CardRef::Card(2).to_string(), "card #2");
    }

    #[test]
    fn test_new_card_validation() {
        assert!(new_card("Ok", Rarity::Common, Some(Element::Blood)).validate().is_ok());
        assert!(new_card("God", Rarity::Deity, Some(Element::Deity)).validate().is_ok());
        assert!(new_card("  ", Rarity::Common, None).validate().is_err());
        assert!(new_card("Fake God", Rarity::Deity, Some(Element::Time)).validate().is_err());
        assert!(new_card("Usurper", Rarity::Rare, Some(Element::Deity)).validate().is_err());
        assert!(new_card("Mash", Rarity::Fused, None).validate().is_err());

        let mut weak = new_card("Weak", Rarity::Common, None);
        weak.power = -1;
        let err = weak.validate().unwrap_err();
        assert!(matches!(
            err.as_rejection(),
            Some(Rejection::InvalidCard { .. })
        ));
    }

    #[test]
    fn test_display_name_marks_special_copies() {
        let view = CardView::from(card::Model {
            id: 1,
            name: "Ember Fox".to_string(),
            description: String::new(),
            rarity: Rarity::Common,
            element: None,
            set_name: "Base".to_string(),
            image_url: None,
            power: 50,
        });
        assert_eq!(view.display_name(false, Some("Shiny")), "Ember Fox");
        assert_eq!(view.display_name(true, Some("Shiny")), "Shiny Ember Fox");
        assert_eq!(view.display_name(true, None), "Ember Fox ★");
    }

    #[tokio::test]
    async fn test_create_and_lookup_ignores_case() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_card(&db, new_card("Ember Fox", Rarity::Common, Some(Element::Blood))).await?;

        let found = get_card_by_name(&db, "ember FOX").await?.unwrap();
        assert_eq!(found.id, created.id);
        let view = find_card_by_name(&db, "EMBER fox").await?.unwrap();
        assert_eq!(view.card_ref, CardRef::Card(created.id));
        assert!(find_card_by_name(&db, "Nope").await?.is_none());

        let dup = create_card(&db, new_card("EMBER FOX", Rarity::Rare, None)).await;
        assert!(matches!(
            dup.unwrap_err().as_rejection(),
            Some(Rejection::DuplicateCard { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_missing_reference() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(resolve(&db, CardRef::Card(99)).await?.is_none());
        assert!(matches!(
            require(&db, CardRef::Fused(99)).await,
            Err(Error::CardNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_random_card_of_rarity() -> Result<()> {
        let db = setup_test_db().await?;
        let mut rng = StdRng::seed_from_u64(1);
        let empty = random_card_of_rarity(&db, &mut rng, Rarity::Legendary).await;
        assert!(matches!(
            empty.unwrap_err().as_rejection(),
            Some(Rejection::EmptyRarityPool { .. })
        ));

        create_test_card(&db, "Dragon", Rarity::Legendary, 90).await?;
        create_test_card(&db, "Slime", Rarity::Common, 5).await?;
        for _ in 0..20 {
            let card = random_card_of_rarity(&db, &mut rng, Rarity::Legendary).await?;
            assert_eq!(card.name, "Dragon");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_skips_existing() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds: Vec<CardSeed> = toml::from_str::<crate::config::GameConfig>(
            r#"
            [[cards]]
            name = "Ember Fox"
            description = "A fox"
            rarity = "common"
            element = "Blood"
            power = 50

            [[cards]]
            name = "Tide Oracle"
            description = "Sees the tides"
            rarity = "rare"
            element = "Time"
            power = 70
            "#,
        )
        .unwrap()
        .cards;

        assert_eq!(seed_catalog(&db, &seeds).await?, 2);
        assert_eq!(seed_catalog(&db, &seeds).await?, 0);
        assert_eq!(cards_of_rarity(&db, Rarity::Rare).await?.len(), 1);
        Ok(())
    }
}
