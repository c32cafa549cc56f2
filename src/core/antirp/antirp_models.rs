// AntiRP domain models.
//
// Pure data types with no Discord dependencies. The Discord layer extracts the rich-presence
// payload from a message and hands it over as an `ActivityInvite`.

use serde::{Deserialize, Serialize};

/// Whitelist entry that matches Spotify listen-along invites.
pub const SPOTIFY_APPLICATION: &str = "spotify";

const SPOTIFY_PARTY_PREFIX: &str = "spotify:";

/// Per-guild AntiRP settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiRpConfig {
    /// Whether activity invites are filtered at all
    pub enabled: bool,
    /// Lower-cased application names that are allowed through
    pub whitelist: Vec<String>,
}

impl AntiRpConfig {
    pub fn is_whitelisted(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.whitelist.iter().any(|entry| *entry == name)
    }
}

/// Rich-presence invite attached to a message.
#[derive(Debug, Clone, Default)]
pub struct ActivityInvite {
    pub party_id: Option<String>,
    pub application_name: Option<String>,
}

impl ActivityInvite {
    /// Spotify is not a real application, it only shows up through its party id.
    pub fn is_spotify(&self) -> bool {
        self.party_id
            .as_deref()
            .is_some_and(|id| id.starts_with(SPOTIFY_PARTY_PREFIX))
    }

    /// Name shown to moderators by `grabname`.
    pub fn display_name(&self) -> Option<String> {
        if self.is_spotify() {
            return Some("Spotify".to_string());
        }
        self.application_name.clone()
    }
}

/// Facts about the author that the Discord layer resolves from permissions.
#[derive(Debug, Clone, Copy)]
pub struct AuthorStanding {
    /// Owner, admins and moderators are never filtered
    pub automod_exempt: bool,
    /// Whether the author may post embeds in the channel
    pub can_embed_links: bool,
}

/// Why a message gets removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    MissingEmbedLinks,
    NotWhitelisted,
}

impl std::fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteReason::MissingEmbedLinks => write!(f, "author lacks embed links"),
            DeleteReason::NotWhitelisted => write!(f, "application not whitelisted"),
        }
    }
}

/// Outcome of checking one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpVerdict {
    Allow,
    Delete(DeleteReason),
}
