// Freshmeat command - page through the members who joined recently.

use std::time::Duration;

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

use crate::core::freshmeat::{
    fresh_members, render_pages, validate_hours, GuildMember, DEFAULT_HOURS,
};
use crate::discord::{Context, Error};

const MEMBER_PAGE_SIZE: u64 = 1000;
const MENU_TIMEOUT: Duration = Duration::from_secs(90);

/// Show the members who joined in the specified timeframe.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    category = "Freshmeat"
)]
pub async fn freshmeat(
    ctx: Context<'_>,
    #[description = "Number of hours to check for new members (default: 24)"] hours: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let hours = hours.unwrap_or(DEFAULT_HOURS);

    if let Err(e) = validate_hours(hours) {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }

    ctx.defer().await?;

    let members = fetch_members(ctx, guild_id).await?;
    let fresh = fresh_members(members, Utc::now(), hours)?;
    if fresh.is_empty() {
        ctx.say(format!("No members joined in the last {hours} hours."))
            .await?;
        return Ok(());
    }

    let pages = render_pages(&fresh);
    let author_name = ctx
        .author_member()
        .await
        .map(|member| member.display_name().to_string())
        .unwrap_or_else(|| ctx.author().name.clone());
    let avatar = ctx.author().face();

    let build_page = |index: usize| {
        serenity::CreateEmbed::new()
            .description(&pages[index])
            .author(
                serenity::CreateEmbedAuthor::new(format!("{author_name}'s freshmeat of the day."))
                    .icon_url(&avatar),
            )
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {} out of {}",
                index + 1,
                pages.len()
            )))
    };
    let build_buttons = |index: usize| {
        vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new("freshmeat_prev")
                .label("◀")
                .style(serenity::ButtonStyle::Primary)
                .disabled(index == 0),
            serenity::CreateButton::new("freshmeat_next")
                .label("▶")
                .style(serenity::ButtonStyle::Primary)
                .disabled(index + 1 == pages.len()),
        ])]
    };

    let mut current = 0;
    let mut reply = poise::CreateReply::default().embed(build_page(current));
    if pages.len() > 1 {
        reply = reply.components(build_buttons(current));
    }
    let handle = ctx.send(reply).await?;
    if pages.len() == 1 {
        return Ok(());
    }

    let msg_id = handle.message().await?.id;

    while let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(MENU_TIMEOUT)
        .filter(move |mci| mci.message.id == msg_id)
        .await
    {
        match mci.data.custom_id.as_str() {
            "freshmeat_prev" => current = current.saturating_sub(1),
            "freshmeat_next" => current = (current + 1).min(pages.len() - 1),
            _ => {}
        }

        if let Err(e) = mci.defer(ctx.http()).await {
            tracing::warn!(error = %e, "Failed to defer freshmeat page change");
            continue;
        }

        if let Err(e) = handle
            .edit(
                ctx,
                poise::CreateReply::default()
                    .embed(build_page(current))
                    .components(build_buttons(current)),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to update freshmeat page");
        }
    }

    // Remove the buttons once nobody is paging anymore
    let _ = handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(build_page(current))
                .components(vec![]),
        )
        .await;

    Ok(())
}

/// Snapshot every guild member, paging through the members endpoint.
async fn fetch_members(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
) -> Result<Vec<GuildMember>, Error> {
    let mut snapshot = Vec::new();
    let mut after = None;

    loop {
        let page = guild_id
            .members(ctx.http(), Some(MEMBER_PAGE_SIZE), after)
            .await?;
        let page_len = page.len() as u64;
        after = page.last().map(|member| member.user.id);

        snapshot.extend(page.iter().filter_map(|member| {
            let joined_at = member.joined_at?;
            Some(GuildMember {
                display_name: member.display_name().to_string(),
                user_id: member.user.id.get(),
                joined_at: DateTime::<Utc>::from_timestamp(joined_at.unix_timestamp(), 0)?,
            })
        }));

        if page_len < MEMBER_PAGE_SIZE {
            break;
        }
    }

    Ok(snapshot)
}
