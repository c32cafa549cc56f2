// GitHub cards on Discord: message scanning, embed rendering and the overflow components.

use std::time::Duration;

use poise::serenity_prelude as serenity;
use tokio::time::Instant;

use crate::core::github_cards::{
    format_search, overflow_reply, CardLayout, FetchedIssue, IssueCard, OverflowEntry, SearchCard,
    MAX_SELECT_OPTIONS,
};
use crate::discord::{Data, Error};

/// The "See all linked issues" button goes away after this long.
const OVERFLOW_BUTTON_LIFETIME: Duration = Duration::from_secs(180);
/// Discord accepts at most this many embeds per message.
const MAX_EMBEDS: usize = 10;

/// Custom id of the persistent "Show issue" select menu.
pub fn select_custom_id(bot_id: serenity::UserId) -> String {
    format!("githubcards-sentinel-{bot_id}")
}

fn overflow_button_id(source: serenity::MessageId) -> String {
    format!("githubcards-overflow-{source}")
}

pub fn card_embed(card: &IssueCard) -> serenity::CreateEmbed {
    let embed = serenity::CreateEmbed::new()
        .author(
            serenity::CreateEmbedAuthor::new(&card.author_name)
                .url(&card.author_url)
                .icon_url(&card.author_icon_url),
        )
        .title(&card.title)
        .url(&card.url)
        .description(&card.description)
        .colour(card.colour)
        .footer(serenity::CreateEmbedFooter::new(&card.footer));

    card.fields.iter().fold(embed, |embed, field| {
        embed.field(&field.name, &field.value, true)
    })
}

pub fn search_embed(card: &SearchCard) -> serenity::CreateEmbed {
    let embed = serenity::CreateEmbed::new().description(&card.description);
    match &card.footer {
        Some(footer) => embed.footer(serenity::CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

fn link_embed(links: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new().description(links)
}

/// All cards for an ephemeral reply, capped at what one message can carry.
fn reply_embeds(fetched: &[FetchedIssue]) -> Vec<serenity::CreateEmbed> {
    let layout = CardLayout::plan(fetched);
    layout
        .inline
        .iter()
        .chain(layout.overflow.iter().map(|entry| &entry.card))
        .take(MAX_EMBEDS)
        .map(card_embed)
        .collect()
}

fn select_row(bot_id: serenity::UserId, entries: &[OverflowEntry]) -> serenity::CreateActionRow {
    let options = entries
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|entry| {
            serenity::CreateSelectMenuOption::new(&entry.option_label, &entry.option_label)
                .description(&entry.option_description)
        })
        .collect();

    serenity::CreateActionRow::SelectMenu(
        serenity::CreateSelectMenu::new(
            select_custom_id(bot_id),
            serenity::CreateSelectMenuKind::String { options },
        )
        .placeholder("Show issue"),
    )
}

/// Scan a guild message for inline searches and issue references and post the results.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let cards = &data.github_cards;
    if message.author.bot || !cards.has_token() {
        return Ok(());
    }

    cards.wait_until_ready().await;
    let guild_id = guild_id.get();

    if let Some((repo, query)) = cards.search_trigger(guild_id, &message.content).await {
        let _ = message.channel_id.broadcast_typing(&ctx.http).await;
        let search = cards.search(&repo, &query).await?;
        let embed = search_embed(&format_search(&search));
        message
            .channel_id
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await?;
        return Ok(());
    }

    let fetchable = cards.references_in(guild_id, &message.content).await;
    if fetchable.is_empty() {
        return Ok(());
    }

    let _ = message.channel_id.broadcast_typing(&ctx.http).await;
    let fetched = cards.fetch_issues(&fetchable).await?;
    if fetched.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        guild_id,
        references = fetchable.issue_count(),
        fetched = fetched.len(),
        "Posting GitHub cards"
    );
    post_cards(ctx, message, &fetched).await
}

async fn post_cards(
    ctx: &serenity::Context,
    source: &serenity::Message,
    fetched: &[FetchedIssue],
) -> Result<(), Error> {
    let layout = CardLayout::plan(fetched);
    let mut embeds: Vec<_> = layout.inline.iter().map(card_embed).collect();

    let Some(summary) = layout.overflow_summary() else {
        source
            .channel_id
            .send_message(&ctx.http, serenity::CreateMessage::new().embeds(embeds))
            .await?;
        return Ok(());
    };

    embeds.push(link_embed(&summary));
    let bot_id = ctx.cache.current_user().id;
    let button_id = overflow_button_id(source.id);
    let select = select_row(bot_id, &layout.overflow);
    let button = serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new(&button_id)
        .label("See all linked issues")
        .style(serenity::ButtonStyle::Secondary)]);

    let posted = source
        .channel_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .embeds(embeds)
                .components(vec![select.clone(), button]),
        )
        .await?;

    let ctx = ctx.clone();
    let overflow = layout.overflow;
    tokio::spawn(async move {
        serve_overflow_button(ctx, posted, button_id, select, overflow).await;
    });
    Ok(())
}

/// Answer "See all linked issues" presses until the button expires, then drop the button.
async fn serve_overflow_button(
    ctx: serenity::Context,
    mut posted: serenity::Message,
    button_id: String,
    select: serenity::CreateActionRow,
    overflow: Vec<OverflowEntry>,
) {
    let deadline = Instant::now() + OVERFLOW_BUTTON_LIFETIME;
    let (cards, links) = overflow_reply(&overflow);
    let mut response_embeds: Vec<_> = cards.iter().map(card_embed).collect();
    if let Some(links) = links {
        response_embeds.push(link_embed(&links));
    }

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let Some(press) = serenity::ComponentInteractionCollector::new(&ctx)
            .message_id(posted.id)
            .custom_ids(vec![button_id.clone()])
            .timeout(remaining)
            .await
        else {
            break;
        };

        let response = serenity::CreateInteractionResponseMessage::new()
            .embeds(response_embeds.clone())
            .ephemeral(true);
        if let Err(e) = press
            .create_response(&ctx.http, serenity::CreateInteractionResponse::Message(response))
            .await
        {
            tracing::warn!(error = %e, "Failed to answer overflow button");
        }
    }

    if let Err(e) = posted
        .edit(&ctx, serenity::EditMessage::new().components(vec![select]))
        .await
    {
        tracing::debug!(error = %e, "Failed to remove overflow button");
    }
}

/// Handle a choice from the persistent "Show issue" select menu.
pub async fn handle_component(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    if interaction.data.custom_id != select_custom_id(ctx.cache.current_user().id) {
        return Ok(());
    }
    let serenity::ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind
    else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };

    let cards = &data.github_cards;
    cards.wait_until_ready().await;
    let fetchable = cards.references_from_values(guild_id.get(), values).await;
    let fetched = cards.fetch_issues(&fetchable).await?;

    let response = if fetched.is_empty() {
        serenity::CreateInteractionResponse::Acknowledge
    } else {
        serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .embeds(reply_embeds(&fetched))
                .ephemeral(true),
        )
    };
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}
