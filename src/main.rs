// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use crate::config::BotConfig;
use crate::core::antirp::AntiRpService;
use crate::core::credentials::{
    CredentialService, GITHUB_SERVICE, GITHUB_TOKEN_KEY, SENTRY_DSN_KEY, SENTRY_SERVICE,
};
use crate::core::events::EventRelay;
use crate::core::github_cards::GithubCardsService;
use crate::core::sentryio::{InteractionCrumbs, SentryService};
use crate::discord::events::lifecycle;
use crate::discord::events::raw_relay::{RawRelayHandler, INTERACTION_CREATE};
use crate::discord::{antirp as antirp_filter, github_cards as card_poster};
use crate::discord::{Data, Error};
use crate::infra::antirp::SqliteAntiRpStore;
use crate::infra::credentials::SqliteCredentialStore;
use crate::infra::database::open_pool;
use crate::infra::github_cards::{GithubGraphqlClient, SqlitePrefixStore};

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if new_message.guild_id.is_none() {
                return Ok(());
            }

            // A message removed by AntiRP isn't scanned for issue references
            match antirp_filter::handle_message(ctx, data, new_message).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => tracing::warn!("AntiRP check failed: {}", e),
            }

            if let Err(e) = card_poster::handle_message(ctx, data, new_message).await {
                tracing::error!(
                    channel_id = new_message.channel_id.get(),
                    "Error posting GitHub cards: {}",
                    e
                );
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            if let Err(e) = card_poster::handle_component(ctx, data, component).await {
                tracing::error!("Error answering GitHub cards select: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Console output, plus info breadcrumbs and error events for Sentry once a client is bound
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
        .with(sentry_tracing::layer())
        .init();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = open_pool(&config.data_dir)
        .await
        .context("Failed to open the SQLite database")?;

    let antirp_store = SqliteAntiRpStore::new(pool.clone());
    antirp_store.migrate().await?;
    let antirp_service = Arc::new(AntiRpService::new(antirp_store));

    let credential_store = SqliteCredentialStore::new(pool.clone());
    credential_store.migrate().await?;
    let credentials = Arc::new(CredentialService::new(credential_store));

    // Stored credentials win over the .env fallbacks
    let github_token = credentials
        .resolve(GITHUB_SERVICE, GITHUB_TOKEN_KEY, config.github_token.as_deref())
        .await?;
    let github_client = GithubGraphqlClient::new(github_token)?;
    let prefix_store = SqlitePrefixStore::new(pool.clone());
    prefix_store.migrate().await?;
    let github_cards = Arc::new(GithubCardsService::new(github_client, prefix_store));
    github_cards
        .initialize()
        .await
        .context("Failed to build the GitHub cards prefix cache")?;

    let sentry = Arc::new(SentryService::new());
    let sentry_dsn = credentials
        .resolve(SENTRY_SERVICE, SENTRY_DSN_KEY, config.sentry_dsn.as_deref())
        .await?;
    if let Err(e) = sentry.init(sentry_dsn.as_deref().unwrap_or_default()) {
        tracing::error!("Sentry was not started: {}", e);
    }

    // Raw interaction payloads become Sentry breadcrumbs
    let relay = Arc::new(EventRelay::new());
    relay.register(
        INTERACTION_CREATE,
        InteractionCrumbs::NAME,
        Arc::new(InteractionCrumbs::new(Arc::clone(&sentry))),
    );

    let data = Data {
        antirp: antirp_service,
        github_cards,
        credentials,
        sentry: Arc::clone(&sentry),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let dev_guild_id = config.dev_guild_id;
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| Box::pin(lifecycle::pre_command(ctx)),
            post_command: |ctx| Box::pin(lifecycle::post_command(ctx)),
            on_error: |error| Box::pin(lifecycle::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                // Guild registration is instant, global registration can take up to an hour
                match dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }

                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .raw_event_handler(RawRelayHandler::new(Arc::clone(&relay)))
        .await
        .context("Error creating client")?;

    let result = client.start().await;
    relay.unregister(INTERACTION_CREATE, InteractionCrumbs::NAME);
    sentry.close();
    result.context("Error running bot")
}
