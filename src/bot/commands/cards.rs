//! Card Discord commands - `open`, `collection`, `inspect`, `tradeup` and `fuse`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{
            catalog::CardView,
            collection::{self, CollectionFilter},
            crafting, pack,
        },
        entities::Rarity,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CARD_COLOR: u32 = 0x00F1_C40F;
    /// Embed descriptions are capped by Discord at 4096 characters.
    const MAX_DESCRIPTION: usize = 4000;

    /// Rarities a collection can be filtered by.
    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum RarityFilter {
        Common,
        Uncommon,
        Rare,
        Legendary,
        Deity,
        Fused,
    }

    impl From<RarityFilter> for Rarity {
        fn from(choice: RarityFilter) -> Self {
            match choice {
                RarityFilter::Common => Self::Common,
                RarityFilter::Uncommon => Self::Uncommon,
                RarityFilter::Rare => Self::Rare,
                RarityFilter::Legendary => Self::Legendary,
                RarityFilter::Deity => Self::Deity,
                RarityFilter::Fused => Self::Fused,
            }
        }
    }

    /// Buys and opens a card pack.
    #[poise::command(slash_command, prefix_command)]
    pub async fn open(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let economy = &data.config.economy;
        let user_id = ctx.author().id.to_string();
        let mut rng = StdRng::from_os_rng();

        let opening =
            pack::open_pack(&data.database, &mut rng, &user_id, &ctx.author().name, economy)
                .await?;

        let prefix = economy.special_prefix.as_deref();
        let pulls = opening
            .cards
            .iter()
            .map(|pulled| {
                let view = CardView::from(pulled.card.clone());
                format!(
                    "{} **{}** ({}, {})",
                    view.rarity.emoji(),
                    view.display_name(pulled.special, prefix),
                    view.rarity,
                    view.power
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let embed = serenity::CreateEmbed::default()
            .title("🎴 Pack Opened")
            .description(pulls)
            .color(CARD_COLOR)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Paid {} {}. Balance: {}",
                economy.pack_cost, economy.currency_name, opening.balance
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows a card collection, yours by default.
    #[poise::command(slash_command, prefix_command, rename = "collection")]
    pub async fn show_collection(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Whose collection to show"] user: Option<serenity::User>,
        #[description = "Only cards of this rarity"] rarity: Option<RarityFilter>,
        #[description = "Only cards from this set"] set: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let filter = CollectionFilter {
            rarity: rarity.map(Into::into),
            set_name: set,
        };
        let owned =
            collection::get_filtered_collection(&data.database, &target.id.to_string(), &filter)
                .await?;

        if owned.is_empty() && filter != CollectionFilter::default() {
            ctx.say("No cards found matching your criteria.").await?;
            return Ok(());
        }
        if owned.is_empty() {
            ctx.say(format!(
                "{} has no cards yet. Use `/open` to buy a pack!",
                target.name
            ))
            .await?;
            return Ok(());
        }

        let prefix = data.config.economy.special_prefix.as_deref();
        let mut description = String::new();
        let mut shown = 0;
        for entry in &owned {
            let line = format!(
                "{} **{}** x{} ({})\n",
                entry.card.rarity.emoji(),
                entry.card.display_name(entry.special(), prefix),
                entry.quantity(),
                entry.card.power
            );
            if description.len() + line.len() > MAX_DESCRIPTION {
                break;
            }
            description.push_str(&line);
            shown += 1;
        }
        if shown < owned.len() {
            description.push_str(&format!("…and {} more", owned.len() - shown));
        }

        let total: i64 = owned.iter().map(collection::OwnedCard::quantity).sum();
        let embed = serenity::CreateEmbed::default()
            .title(format!("📚 {}'s Collection", target.name))
            .description(description)
            .color(CARD_COLOR)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} distinct cards, {total} total",
                owned.len()
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows one of your cards in detail.
    #[poise::command(slash_command, prefix_command)]
    pub async fn inspect(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Card to inspect"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        card: String,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let details = collection::inspect_card(&data.database, &user_id, &card).await?;
        let owned = &details.owned;
        let view = &owned.card;

        let kind = if details.origin.is_some() {
            "Fused Card"
        } else {
            "Regular Card"
        };
        let element = view
            .element
            .map_or_else(|| "None".to_string(), |element| element.to_string());
        let mut embed = serenity::CreateEmbed::default()
            .title(format!(
                "{} {}",
                view.rarity.emoji(),
                view.display_name(owned.special(), data.config.economy.special_prefix.as_deref())
            ))
            .description(&view.description)
            .color(CARD_COLOR)
            .field("Type", kind, true)
            .field("Rarity", view.rarity.to_string(), true)
            .field("Set", &view.set_name, true)
            .field("Element", element, true)
            .field("Power", view.power.to_string(), true)
            .field("Quantity", owned.quantity().to_string(), true)
            .footer(serenity::CreateEmbedFooter::new(view.card_ref.to_string()));

        if let Some(origin) = &details.origin {
            let parents = if origin.parents.is_empty() {
                "Parent card information unavailable".to_string()
            } else {
                origin
                    .parents
                    .iter()
                    .map(|parent| format!("{} (x{})", parent.name, origin.parent_quantity))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            embed = embed
                .field("Fused From", parents, false)
                .field("Created By", collection::mention(&origin.fused_by), true);
        }
        if let Some(url) = &view.image_url {
            embed = embed.image(url);
        }

        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Trades five copies of a card for a random card of the next rarity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn tradeup(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Card to trade up"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        card: String,
    ) -> Result<()> {
        let data = ctx.data();
        let economy = &data.config.economy;
        let user_id = ctx.author().id.to_string();
        let mut rng = StdRng::from_os_rng();

        let result = crafting::trade_up(
            &data.database,
            &mut rng,
            &user_id,
            &ctx.author().name,
            &card,
            economy,
        )
        .await?;

        let received = CardView::from(result.received);
        let mut message = format!(
            "🔁 Traded {} **{}** for {} **{}** ({})! (+{} XP)",
            crafting::TRADE_UP_COST,
            result.consumed.name,
            received.rarity.emoji(),
            received.display_name(result.special, economy.special_prefix.as_deref()),
            received.rarity,
            result.xp.gained
        );
        if result.xp.levels_gained > 0 {
            message.push_str(&format!("\n🎉 Level up! Now level {}.", result.xp.level));
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Fuses ten copies each of two cards into a brand-new card.
    #[poise::command(slash_command, prefix_command)]
    pub async fn fuse(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "First card"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        first: String,
        #[description = "Second card"]
        #[autocomplete = "autocomplete::autocomplete_owned_card"]
        second: String,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let fused = crafting::fuse(
            &data.database,
            &user_id,
            &ctx.author().name,
            &first,
            &second,
        )
        .await?;

        let mut embed = serenity::CreateEmbed::default()
            .title(format!("✨ {}", fused.name))
            .description(&fused.description)
            .color(CARD_COLOR)
            .field("Power", fused.power.to_string(), true)
            .field("Set", &fused.set_name, true);
        if let Some(url) = &fused.image_url {
            embed = embed.thumbnail(url);
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
