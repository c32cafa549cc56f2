// AntiRP commands - per-guild toggle and application whitelist.

use crate::discord::antirp::activity_invite;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage the settings for AntiRP.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "AntiRP",
    subcommands("toggle", "grabname", "whitelist")
)]
pub async fn antirp(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Toggle AntiRP on or off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Turn AntiRP on (true) or off (false); flips it when omitted"]
    enabled: Option<bool>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let enabled = match enabled {
        Some(enabled) => {
            ctx.data().antirp.set_enabled(guild_id, enabled).await?;
            enabled
        }
        None => ctx.data().antirp.toggle(guild_id).await?,
    };

    let state = if enabled { "on" } else { "off" };
    ctx.say(format!("Done! Turned {state} AntiRP")).await?;
    Ok(())
}

/// Grab an application name via RP invite.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn grabname(
    ctx: Context<'_>,
    #[description = "Channel the invite was posted in"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
    #[description = "ID of the message carrying the invite"] message_id: String,
) -> Result<(), Error> {
    let Some(message_id) = message_id.trim().parse::<u64>().ok().filter(|id| *id != 0) else {
        ctx.say("Couldn't find the message you're looking for.").await?;
        return Ok(());
    };

    let message_id = serenity::MessageId::new(message_id);
    let message = match channel.id.message(ctx, message_id).await {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(channel_id = channel.id.get(), error = %e, "grabname lookup failed");
            ctx.say("Couldn't find the message you're looking for.").await?;
            return Ok(());
        }
    };

    let reply = match activity_invite(&message) {
        None => "This message has no rich presence invite".to_string(),
        Some(invite) => match invite.display_name() {
            Some(name) => format!("Application name: {name}"),
            None => "This message has no rich presence invite".to_string(),
        },
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Manage the application whitelist for AntiRP.
///
/// Once anything is whitelisted, invites from every other application are removed.
/// Spotify isn't an application but can be whitelisted as "spotify".
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("add", "remove", "clear", "list")
)]
pub async fn whitelist(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a new whitelisted application.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Application name"] application_name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let name = application_name.trim().to_lowercase();

    if ctx.data().antirp.add_to_whitelist(guild_id, &name).await? {
        ctx.say(format!("Added ``{name}`` to the whitelist.")).await?;
    } else {
        ctx.say(format!("``{name}`` is already whitelisted.")).await?;
    }
    Ok(())
}

/// Remove a whitelisted application.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Application name"] application_name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let name = application_name.trim().to_lowercase();

    ctx.data()
        .antirp
        .remove_from_whitelist(guild_id, &name)
        .await?;
    ctx.say(format!("Removed ``{name}`` from the whitelist.")).await?;
    Ok(())
}

/// Remove all whitelisted applications.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    ctx.data().antirp.clear_whitelist(guild_id).await?;
    ctx.say("Cleared the whitelist.").await?;
    Ok(())
}

/// List all the whitelisted applications.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let whitelist = ctx.data().antirp.whitelist(guild_id).await?;

    if whitelist.is_empty() {
        ctx.say("No applications are whitelisted.").await?;
    } else {
        ctx.say(format!("Whitelisted applications:\n{}", whitelist.join(", ")))
            .await?;
    }
    Ok(())
}
