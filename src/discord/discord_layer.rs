// Discord layer - commands and event handlers.

use std::sync::Arc;

use crate::core::antirp::AntiRpService;
use crate::core::credentials::CredentialService;
use crate::core::github_cards::GithubCardsService;
use crate::core::sentryio::SentryService;
use crate::infra::antirp::SqliteAntiRpStore;
use crate::infra::credentials::SqliteCredentialStore;
use crate::infra::github_cards::{GithubGraphqlClient, SqlitePrefixStore};

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "antirp/activity_filter.rs"]
pub mod antirp;

#[path = "github_cards/card_poster.rs"]
pub mod github_cards;

#[path = "massmove/voice_mover.rs"]
pub mod massmove;

#[path = "events/mod.rs"]
pub mod events;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type GithubCards = GithubCardsService<GithubGraphqlClient, SqlitePrefixStore>;

/// Data that's shared across all commands and event handlers.
pub struct Data {
    pub antirp: Arc<AntiRpService<SqliteAntiRpStore>>,
    pub github_cards: Arc<GithubCards>,
    pub credentials: Arc<CredentialService<SqliteCredentialStore>>,
    pub sentry: Arc<SentryService>,
}
