// Massmove commands - relocate everyone from one voice channel to another.

use crate::core::massmove::{move_all_members, MoveRoute, RouteError};
use crate::discord::massmove::{
    afk_channel, current_voice_channel, voice_snapshot, GuildVoiceMover,
};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Massmove members to another voice channel.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MOVE_MEMBERS",
    category = "Massmove",
    subcommands("channels", "afk", "me")
)]
pub async fn massmove(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn run_move(ctx: Context<'_>, route: Result<MoveRoute, RouteError>) -> Result<(), Error> {
    let route = match route {
        Ok(route) => route,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let serenity_ctx = ctx.serenity_context();

    let snapshot = voice_snapshot(serenity_ctx, guild_id, serenity::ChannelId::new(route.from));
    let mover = GuildVoiceMover::new(serenity_ctx, guild_id);
    let outcome = move_all_members(&mover, &snapshot, route.to).await;

    tracing::info!(
        guild_id = guild_id.get(),
        from = route.from,
        to = route.to,
        outcome = ?outcome,
        "Massmove finished"
    );

    ctx.say(outcome.describe(route.from, route.to)).await?;
    Ok(())
}

/// Move everyone from one voice channel to another.
#[poise::command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn channels(
    ctx: Context<'_>,
    #[description = "Channel to move members out of"]
    #[channel_types("Voice", "Stage")]
    from_channel: serenity::GuildChannel,
    #[description = "Channel to move members into"]
    #[channel_types("Voice", "Stage")]
    to_channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let route = MoveRoute::new(from_channel.id.get(), to_channel.id.get());
    run_move(ctx, Ok(route)).await
}

/// Move everyone from a voice channel into the AFK channel.
#[poise::command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn afk(
    ctx: Context<'_>,
    #[description = "Channel to move members out of"]
    #[channel_types("Voice", "Stage")]
    from_channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let afk = afk_channel(ctx.serenity_context(), guild_id).map(|id| id.get());
    run_move(ctx, MoveRoute::into_afk(from_channel.id.get(), afk)).await
}

/// Move you and everyone else in your voice channel to another channel.
#[poise::command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn me(
    ctx: Context<'_>,
    #[description = "Channel to move everyone into"]
    #[channel_types("Voice", "Stage")]
    to_channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let own = current_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)
        .map(|id| id.get());
    run_move(ctx, MoveRoute::from_caller(own, to_channel.id.get())).await
}
