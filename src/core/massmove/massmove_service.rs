// Massmove - relocates everyone in one voice channel to another.
//
// The mover trait is the seam to Discord: it answers permission questions from the cache and
// performs the actual member move over HTTP.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Failed to move member: {0}")]
    Http(String),
}

/// A shortcut destination or source that can't be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("This server doesn't have an AFK channel.")]
    NoAfkChannel,
    #[error("You have to be in an voice channel to use this command.")]
    CallerNotInVoice,
}

/// Source and destination channel of one mass move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRoute {
    pub from: u64,
    pub to: u64,
}

impl MoveRoute {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Everyone in `from` goes to the guild's AFK channel.
    pub fn into_afk(from: u64, afk_channel: Option<u64>) -> Result<Self, RouteError> {
        let to = afk_channel.ok_or(RouteError::NoAfkChannel)?;
        Ok(Self::new(from, to))
    }

    /// The caller and everyone sharing their voice channel go to `to`.
    pub fn from_caller(caller_channel: Option<u64>, to: u64) -> Result<Self, RouteError> {
        let from = caller_channel.ok_or(RouteError::CallerNotInVoice)?;
        Ok(Self::new(from, to))
    }
}

/// A voice or stage channel together with who is currently connected.
#[derive(Debug, Clone)]
pub struct VoiceChannelSnapshot {
    pub channel_id: u64,
    pub member_ids: Vec<u64>,
}

/// How a mass move ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nobody was in the source channel, nothing was attempted
    EmptySource,
    /// The bot may not move members in the given channel
    MissingPermission { channel_id: u64 },
    /// Every member was attempted; `failed` of them could not be moved
    Moved { attempted: usize, failed: usize },
}

impl MoveOutcome {
    /// Render the user-facing reply.
    pub fn describe(&self, from_channel: u64, to_channel: u64) -> String {
        match self {
            MoveOutcome::EmptySource => {
                format!("<#{from_channel}> doesn't have any members in it.")
            }
            MoveOutcome::MissingPermission { channel_id } => {
                format!("I don't have permissions to move members in <#{channel_id}>")
            }
            MoveOutcome::Moved { attempted, .. } => {
                let plural = if *attempted == 1 { "" } else { "s" };
                format!(
                    "Done, massmoved {attempted} member{plural} from **<#{from_channel}>** \
                     to **<#{to_channel}>**"
                )
            }
        }
    }
}

#[async_trait]
pub trait MemberMover: Send + Sync {
    /// Whether the bot holds Move Members in the channel.
    fn can_move_members(&self, channel_id: u64) -> bool;

    async fn move_member(&self, user_id: u64, channel_id: u64) -> Result<(), MoveError>;
}

/// Move every member of `from` into `to`, ignoring individual failures.
pub async fn move_all_members<M: MemberMover + ?Sized>(
    mover: &M,
    from: &VoiceChannelSnapshot,
    to_channel: u64,
) -> MoveOutcome {
    if from.member_ids.is_empty() {
        return MoveOutcome::EmptySource;
    }

    // Check both ends up front so we don't leave people split across channels
    for channel_id in [from.channel_id, to_channel] {
        if !mover.can_move_members(channel_id) {
            return MoveOutcome::MissingPermission { channel_id };
        }
    }

    let mut failed = 0;
    for user_id in &from.member_ids {
        if let Err(e) = mover.move_member(*user_id, to_channel).await {
            tracing::debug!(
                user_id,
                to_channel,
                error = %e,
                "Skipping member during massmove"
            );
            failed += 1;
        }
    }

    MoveOutcome::Moved {
        attempted: from.member_ids.len(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashSet;
    use std::sync::Mutex;

    struct MockMover {
        allowed_channels: DashSet<u64>,
        failing_users: DashSet<u64>,
        calls: Mutex<Vec<(u64, u64)>>,
    }

    impl MockMover {
        fn new(allowed: &[u64]) -> Self {
            let allowed_channels = DashSet::new();
            for id in allowed {
                allowed_channels.insert(*id);
            }
            Self {
                allowed_channels,
                failing_users: DashSet::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MemberMover for MockMover {
        fn can_move_members(&self, channel_id: u64) -> bool {
            self.allowed_channels.contains(&channel_id)
        }

        async fn move_member(&self, user_id: u64, channel_id: u64) -> Result<(), MoveError> {
            self.calls.lock().unwrap().push((user_id, channel_id));
            if self.failing_users.contains(&user_id) {
                return Err(MoveError::Http("Missing Permissions".to_string()));
            }
            Ok(())
        }
    }

    fn channel(id: u64, members: &[u64]) -> VoiceChannelSnapshot {
        VoiceChannelSnapshot {
            channel_id: id,
            member_ids: members.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_empty_source_performs_no_calls() {
        let mover = MockMover::new(&[1, 2]);

        let outcome = move_all_members(&mover, &channel(1, &[]), 2).await;

        assert_eq!(outcome, MoveOutcome::EmptySource);
        assert_eq!(mover.call_count(), 0);
        assert_eq!(outcome.describe(1, 2), "<#1> doesn't have any members in it.");
    }

    #[tokio::test]
    async fn test_missing_destination_permission() {
        let mover = MockMover::new(&[1]);

        let outcome = move_all_members(&mover, &channel(1, &[10, 11]), 2).await;

        assert_eq!(outcome, MoveOutcome::MissingPermission { channel_id: 2 });
        assert_eq!(mover.call_count(), 0);
        assert_eq!(
            outcome.describe(1, 2),
            "I don't have permissions to move members in <#2>"
        );
    }

    #[tokio::test]
    async fn test_failures_are_ignored() {
        let mover = MockMover::new(&[1, 2]);
        mover.failing_users.insert(11);

        let outcome = move_all_members(&mover, &channel(1, &[10, 11, 12]), 2).await;

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                attempted: 3,
                failed: 1
            }
        );
        assert_eq!(mover.call_count(), 3);
        assert_eq!(
            outcome.describe(1, 2),
            "Done, massmoved 3 members from **<#1>** to **<#2>**"
        );
    }

    #[tokio::test]
    async fn test_single_member_is_singular() {
        let mover = MockMover::new(&[1, 2]);

        let outcome = move_all_members(&mover, &channel(1, &[10]), 2).await;

        assert_eq!(
            outcome.describe(1, 2),
            "Done, massmoved 1 member from **<#1>** to **<#2>**"
        );
    }

    #[test]
    fn test_caller_route_starts_in_callers_channel() {
        let route = MoveRoute::from_caller(Some(7), 9).unwrap();
        assert_eq!(route, MoveRoute { from: 7, to: 9 });

        assert_eq!(
            MoveRoute::from_caller(None, 9),
            Err(RouteError::CallerNotInVoice)
        );
    }

    #[test]
    fn test_afk_route_ends_in_afk_channel() {
        assert_eq!(
            MoveRoute::into_afk(3, Some(4)).unwrap(),
            MoveRoute { from: 3, to: 4 }
        );

        let err = MoveRoute::into_afk(3, None).unwrap_err();
        assert_eq!(err.to_string(), "This server doesn't have an AFK channel.");
    }

    #[tokio::test]
    async fn test_caller_route_moves_callers_channel() {
        let mover = MockMover::new(&[7, 9]);
        let route = MoveRoute::from_caller(Some(7), 9).unwrap();

        move_all_members(&mover, &channel(route.from, &[1, 2]), route.to).await;

        assert_eq!(*mover.calls.lock().unwrap(), vec![(1, 9), (2, 9)]);
    }
}
