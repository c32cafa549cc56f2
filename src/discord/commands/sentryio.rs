// Sentry.IO commands - owner-only status and DSN setup.

use crate::core::credentials::{SENTRY_DSN_KEY, SENTRY_SERVICE};
use crate::discord::{Context, Error};

const INSTRUCTIONS: &str = "\
1. Go to Settings page of your Sentry Account at <https://sentry.io/settings>
2. Go to Projects list and select the project you want to use for this bot.
3. Select Client Keys (DSN) menu entry at the left.
4. Copy your DSN and set it with ``/sentryio dsn [YOUR DSN]``.";

/// Configure the Sentry.IO integration.
#[poise::command(
    slash_command,
    owners_only,
    category = "Sentry.IO",
    subcommands("status", "instructions", "dsn")
)]
pub async fn sentryio(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Check the status of the Sentry.IO integration.
#[poise::command(slash_command, owners_only, ephemeral)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let reply = match ctx.data().sentry.status() {
        Some(dsn) => format!("Sentry.IO is initialized with DSN: `{dsn}`"),
        None => "Sentry.IO is not initialized.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Learn how to set up the Sentry.IO integration.
#[poise::command(slash_command, owners_only)]
pub async fn instructions(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(INSTRUCTIONS).await?;
    Ok(())
}

/// Store a new DSN and restart the Sentry client with it.
#[poise::command(slash_command, owners_only, ephemeral)]
pub async fn dsn(
    ctx: Context<'_>,
    #[description = "Client key (DSN) of the Sentry project"] dsn: String,
) -> Result<(), Error> {
    let data = ctx.data();

    if let Err(e) = data.sentry.init(&dsn) {
        ctx.say(e.to_string()).await?;
        return Ok(());
    }
    data.credentials
        .store(SENTRY_SERVICE, SENTRY_DSN_KEY, &dsn)
        .await?;

    let reply = if data.sentry.is_initialized() {
        "Sentry.IO has been reinitialized with the new DSN."
    } else {
        "The DSN was cleared, Sentry.IO is now disabled."
    };
    ctx.say(reply).await?;
    Ok(())
}
