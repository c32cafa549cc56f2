// Massmove adapters: voice state snapshots from the cache and the serenity-backed mover.

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use crate::core::massmove::{MemberMover, MoveError, VoiceChannelSnapshot};

/// Moves members over HTTP while answering permission checks from the cache.
pub struct GuildVoiceMover<'a> {
    ctx: &'a serenity::Context,
    guild_id: serenity::GuildId,
}

impl<'a> GuildVoiceMover<'a> {
    pub fn new(ctx: &'a serenity::Context, guild_id: serenity::GuildId) -> Self {
        Self { ctx, guild_id }
    }
}

#[async_trait]
impl MemberMover for GuildVoiceMover<'_> {
    fn can_move_members(&self, channel_id: u64) -> bool {
        let bot_id = self.ctx.cache.current_user().id;
        let Some(guild) = self.ctx.cache.guild(self.guild_id) else {
            return false;
        };
        let channel = guild.channels.get(&serenity::ChannelId::new(channel_id));
        let member = guild.members.get(&bot_id);
        match (channel, member) {
            (Some(channel), Some(member)) => {
                guild.user_permissions_in(channel, member).move_members()
            }
            _ => false,
        }
    }

    async fn move_member(&self, user_id: u64, channel_id: u64) -> Result<(), MoveError> {
        self.guild_id
            .move_member(
                &self.ctx.http,
                serenity::UserId::new(user_id),
                serenity::ChannelId::new(channel_id),
            )
            .await
            .map(|_| ())
            .map_err(|e| MoveError::Http(e.to_string()))
    }
}

/// Everyone currently connected to `channel_id`, according to the cache.
pub fn voice_snapshot(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
) -> VoiceChannelSnapshot {
    let member_ids = ctx
        .cache
        .guild(guild_id)
        .map(|guild| {
            guild
                .voice_states
                .values()
                .filter(|state| state.channel_id == Some(channel_id))
                .map(|state| state.user_id.get())
                .collect()
        })
        .unwrap_or_default();

    VoiceChannelSnapshot {
        channel_id: channel_id.get(),
        member_ids,
    }
}

pub fn afk_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Option<serenity::ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.afk_metadata.as_ref().map(|afk| afk.afk_channel_id)
}

/// The voice channel a user is connected to, if any.
pub fn current_voice_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Option<serenity::ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.voice_states.get(&user_id)?.channel_id
}
