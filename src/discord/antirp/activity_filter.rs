// AntiRP message filter - the Discord side of `AntiRpService::check_message`.

use crate::core::antirp::{ActivityInvite, AuthorStanding, RpVerdict};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Pull the rich-presence invite out of a message, if it carries one.
pub fn activity_invite(message: &serenity::Message) -> Option<ActivityInvite> {
    let activity = message.activity.as_ref()?;
    Some(ActivityInvite {
        party_id: activity.party_id.clone(),
        application_name: message.application.as_ref().map(|app| app.name.clone()),
    })
}

/// Resolve the author's automod exemption and embed permission in the message channel.
///
/// Returns `None` when the guild or channel isn't cached.
async fn author_standing(
    ctx: &serenity::Context,
    message: &serenity::Message,
    guild_id: serenity::GuildId,
) -> Result<Option<AuthorStanding>, Error> {
    // Checks the cache first, then falls back to HTTP
    let member = guild_id.member(ctx, message.author.id).await?;

    let Some(guild) = ctx.cache.guild(guild_id) else {
        return Ok(None);
    };
    let channel = guild.channels.get(&message.channel_id).or_else(|| {
        guild
            .threads
            .iter()
            .find(|thread| thread.id == message.channel_id)
    });
    let Some(channel) = channel else {
        return Ok(None);
    };

    let permissions = guild.user_permissions_in(channel, &member);
    Ok(Some(AuthorStanding {
        automod_exempt: guild.owner_id == message.author.id
            || permissions.administrator()
            || permissions.manage_guild()
            || permissions.manage_messages(),
        can_embed_links: permissions.embed_links(),
    }))
}

/// Delete the message when it carries a non-whitelisted activity invite.
/// Returns `true` when the message was removed.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<bool, Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(false);
    };
    let Some(activity) = activity_invite(message) else {
        return Ok(false);
    };
    let Some(standing) = author_standing(ctx, message, guild_id).await? else {
        tracing::debug!(
            guild_id = guild_id.get(),
            channel_id = message.channel_id.get(),
            "Channel not cached, skipping AntiRP check"
        );
        return Ok(false);
    };

    let verdict = data
        .antirp
        .check_message(guild_id.get(), Some(&activity), standing)
        .await?;

    let RpVerdict::Delete(reason) = verdict else {
        return Ok(false);
    };

    match message.delete(ctx).await {
        Ok(()) => {
            tracing::info!(
                guild_id = guild_id.get(),
                author_id = message.author.id.get(),
                reason = %reason,
                "Deleted rich presence invite"
            );
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(
                guild_id = guild_id.get(),
                error = %e,
                "Failed to delete rich presence invite"
            );
            Ok(false)
        }
    }
}
