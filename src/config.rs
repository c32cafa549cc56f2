// Startup configuration read from the environment (after `.env` is loaded).

use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")]
    MissingDiscordToken,
    #[error("DEV_GUILD_ID must be a guild id, got {0:?}")]
    InvalidGuildId(String),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// Folder holding the SQLite database
    pub data_dir: PathBuf,
    /// Fallback used until the owner stores a token with `/githubcards token`
    pub github_token: Option<String>,
    /// Fallback used until the owner stores a DSN with `/sentryio dsn`
    pub sentry_dsn: Option<String>,
    /// Register commands in this guild only, for instant updates while developing
    pub dev_guild_id: Option<u64>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = non_empty("DISCORD_TOKEN").ok_or(ConfigError::MissingDiscordToken)?;
        let dev_guild_id = match non_empty("DEV_GUILD_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .ok_or(ConfigError::InvalidGuildId(raw))?,
            ),
            None => None,
        };

        Ok(Self {
            discord_token,
            data_dir: PathBuf::from(
                non_empty("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            github_token: non_empty("GITHUB_TOKEN"),
            sentry_dsn: non_empty("SENTRY_DSN"),
            dev_guild_id,
        })
    }
}
