// AntiRP service - decides whether a rich-presence invite may stay in a channel.
//
// NO Discord dependencies here. The Discord layer deletes the message when told to.

use super::antirp_models::{
    ActivityInvite, AntiRpConfig, AuthorStanding, DeleteReason, RpVerdict, SPOTIFY_APPLICATION,
};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AntiRpError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for per-guild AntiRP settings.
#[async_trait]
pub trait AntiRpStore: Send + Sync {
    /// Get the settings for a guild, falling back to defaults.
    async fn get_config(&self, guild_id: u64) -> Result<AntiRpConfig, AntiRpError>;

    async fn save_config(&self, guild_id: u64, config: AntiRpConfig) -> Result<(), AntiRpError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AntiRpService<S: AntiRpStore> {
    store: S,
}

impl<S: AntiRpStore> AntiRpService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Check a guild message. Messages without an activity payload are always allowed.
    pub async fn check_message(
        &self,
        guild_id: u64,
        activity: Option<&ActivityInvite>,
        author: AuthorStanding,
    ) -> Result<RpVerdict, AntiRpError> {
        let Some(activity) = activity else {
            return Ok(RpVerdict::Allow);
        };

        let config = self.store.get_config(guild_id).await?;
        Ok(evaluate(&config, activity, author))
    }

    /// Flip the toggle and return the new state.
    pub async fn toggle(&self, guild_id: u64) -> Result<bool, AntiRpError> {
        let mut config = self.store.get_config(guild_id).await?;
        config.enabled = !config.enabled;
        let enabled = config.enabled;
        self.store.save_config(guild_id, config).await?;
        Ok(enabled)
    }

    pub async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), AntiRpError> {
        let mut config = self.store.get_config(guild_id).await?;
        config.enabled = enabled;
        self.store.save_config(guild_id, config).await
    }

    /// Add an application name. Returns `false` if it was already listed.
    pub async fn add_to_whitelist(&self, guild_id: u64, name: &str) -> Result<bool, AntiRpError> {
        let name = name.trim().to_lowercase();
        let mut config = self.store.get_config(guild_id).await?;
        if config.whitelist.contains(&name) {
            return Ok(false);
        }
        config.whitelist.push(name);
        self.store.save_config(guild_id, config).await?;
        Ok(true)
    }

    /// Remove an application name. Returns `false` if it wasn't listed.
    pub async fn remove_from_whitelist(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<bool, AntiRpError> {
        let name = name.trim().to_lowercase();
        let mut config = self.store.get_config(guild_id).await?;
        let before = config.whitelist.len();
        config.whitelist.retain(|entry| *entry != name);
        if config.whitelist.len() == before {
            return Ok(false);
        }
        self.store.save_config(guild_id, config).await?;
        Ok(true)
    }

    pub async fn clear_whitelist(&self, guild_id: u64) -> Result<(), AntiRpError> {
        let mut config = self.store.get_config(guild_id).await?;
        config.whitelist.clear();
        self.store.save_config(guild_id, config).await
    }

    pub async fn whitelist(&self, guild_id: u64) -> Result<Vec<String>, AntiRpError> {
        Ok(self.store.get_config(guild_id).await?.whitelist)
    }
}

/// Apply the guild settings to one activity invite.
pub fn evaluate(
    config: &AntiRpConfig,
    activity: &ActivityInvite,
    author: AuthorStanding,
) -> RpVerdict {
    if !config.enabled || author.automod_exempt {
        return RpVerdict::Allow;
    }

    if !author.can_embed_links {
        return RpVerdict::Delete(DeleteReason::MissingEmbedLinks);
    }

    // The whitelist only filters once something is on it
    if config.whitelist.is_empty() {
        return RpVerdict::Allow;
    }

    if activity.is_spotify() && config.is_whitelisted(SPOTIFY_APPLICATION) {
        return RpVerdict::Allow;
    }

    match activity.application_name.as_deref() {
        Some(name) if config.is_whitelisted(name) => RpVerdict::Allow,
        _ => RpVerdict::Delete(DeleteReason::NotWhitelisted),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    struct MockAntiRpStore {
        configs: DashMap<u64, AntiRpConfig>,
    }

    impl MockAntiRpStore {
        fn new() -> Self {
            Self {
                configs: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl AntiRpStore for MockAntiRpStore {
        async fn get_config(&self, guild_id: u64) -> Result<AntiRpConfig, AntiRpError> {
            Ok(self
                .configs
                .get(&guild_id)
                .map(|c| c.clone())
                .unwrap_or_default())
        }

        async fn save_config(
            &self,
            guild_id: u64,
            config: AntiRpConfig,
        ) -> Result<(), AntiRpError> {
            self.configs.insert(guild_id, config);
            Ok(())
        }
    }

    fn member() -> AuthorStanding {
        AuthorStanding {
            automod_exempt: false,
            can_embed_links: true,
        }
    }

    fn game_invite(name: &str) -> ActivityInvite {
        ActivityInvite {
            party_id: Some("abc123".to_string()),
            application_name: Some(name.to_string()),
        }
    }

    fn spotify_invite() -> ActivityInvite {
        ActivityInvite {
            party_id: Some("spotify:1234".to_string()),
            application_name: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_guild_allows_everything() {
        let service = AntiRpService::new(MockAntiRpStore::new());

        let verdict = service
            .check_message(1, Some(&game_invite("Some Game")), member())
            .await
            .unwrap();

        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[tokio::test]
    async fn test_message_without_activity_is_allowed() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();

        let verdict = service.check_message(1, None, member()).await.unwrap();
        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[tokio::test]
    async fn test_unlisted_application_is_deleted() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();
        service.add_to_whitelist(1, "Minecraft").await.unwrap();

        let verdict = service
            .check_message(1, Some(&game_invite("Other Game")), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Delete(DeleteReason::NotWhitelisted));

        let verdict = service
            .check_message(1, Some(&game_invite("MINECRAFT")), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[tokio::test]
    async fn test_spotify_is_matched_by_party_id() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();
        service.add_to_whitelist(1, "Minecraft").await.unwrap();

        let verdict = service
            .check_message(1, Some(&spotify_invite()), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Delete(DeleteReason::NotWhitelisted));

        service.add_to_whitelist(1, "Spotify").await.unwrap();
        let verdict = service
            .check_message(1, Some(&spotify_invite()), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[tokio::test]
    async fn test_empty_whitelist_keeps_invites() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();

        let verdict = service
            .check_message(1, Some(&game_invite("Some Game")), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Allow);

        let verdict = service
            .check_message(1, Some(&spotify_invite()), member())
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[test]
    fn test_empty_whitelist_still_requires_embed_links() {
        let config = AntiRpConfig {
            enabled: true,
            whitelist: Vec::new(),
        };
        let muted = AuthorStanding {
            automod_exempt: false,
            can_embed_links: false,
        };

        assert_eq!(
            evaluate(&config, &game_invite("Some Game"), muted),
            RpVerdict::Delete(DeleteReason::MissingEmbedLinks)
        );
    }

    #[tokio::test]
    async fn test_exempt_author_is_never_filtered() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();

        let moderator = AuthorStanding {
            automod_exempt: true,
            can_embed_links: false,
        };
        let verdict = service
            .check_message(1, Some(&game_invite("Other Game")), moderator)
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Allow);
    }

    #[tokio::test]
    async fn test_missing_embed_links_overrides_whitelist() {
        let service = AntiRpService::new(MockAntiRpStore::new());
        service.set_enabled(1, true).await.unwrap();
        service.add_to_whitelist(1, "minecraft").await.unwrap();

        let muted = AuthorStanding {
            automod_exempt: false,
            can_embed_links: false,
        };
        let verdict = service
            .check_message(1, Some(&game_invite("Minecraft")), muted)
            .await
            .unwrap();
        assert_eq!(verdict, RpVerdict::Delete(DeleteReason::MissingEmbedLinks));
    }

    #[tokio::test]
    async fn test_toggle_flips_state() {
        let service = AntiRpService::new(MockAntiRpStore::new());

        assert!(service.toggle(9).await.unwrap());
        assert!(!service.toggle(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_whitelist_management() {
        let service = AntiRpService::new(MockAntiRpStore::new());

        assert!(service.add_to_whitelist(3, "Minecraft").await.unwrap());
        assert!(!service.add_to_whitelist(3, "minecraft").await.unwrap());
        assert!(service.add_to_whitelist(3, "spotify").await.unwrap());
        assert_eq!(service.whitelist(3).await.unwrap(), vec!["minecraft", "spotify"]);

        assert!(service.remove_from_whitelist(3, "MINECRAFT").await.unwrap());
        assert!(!service.remove_from_whitelist(3, "terraria").await.unwrap());

        service.clear_whitelist(3).await.unwrap();
        assert!(service.whitelist(3).await.unwrap().is_empty());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(spotify_invite().display_name().as_deref(), Some("Spotify"));
        assert_eq!(game_invite("Among Us").display_name().as_deref(), Some("Among Us"));
        assert_eq!(ActivityInvite::default().display_name(), None);
    }
}
