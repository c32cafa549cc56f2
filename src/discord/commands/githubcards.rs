// GitHub cards commands - prefix management, token setup and explicit search.

use crate::core::credentials::{GITHUB_SERVICE, GITHUB_TOKEN_KEY};
use crate::core::github_cards::format_search;
use crate::discord::github_cards::search_embed;
use crate::discord::{Context, Error};

const INSTRUCTIONS: &str = "\
Begin by creating a new personal token on your GitHub Account here;
<https://github.com/settings/tokens>

If you do not trust this to your own account, its recommended you make a new GitHub account to act for the bot.
No additional permissions are required for public repositories, if you want to fetch from private repositories, you require full \"repo\" permissions.

Copy your newly created token and run the following command (bot owner only).
``/githubcards token [YOUR NEW TOKEN]``

The token is applied right away and you're set to add in new prefixes.";

/// GitHubCards settings.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "GitHub Cards",
    subcommands("add", "remove", "list", "instructions", "token")
)]
pub async fn githubcards(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a new GitHub repository with the given prefix.
///
/// Format for adding a new GitHub repo is "Username/Repository"
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Prefix used in messages, e.g. gh for gh#12"] prefix: String,
    #[description = "Repository as Username/Repository"] github_slug: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let outcome = ctx
        .data()
        .github_cards
        .add_prefix(guild_id, &prefix, &github_slug)
        .await?;
    ctx.say(outcome.message(&github_slug)).await?;
    Ok(())
}

/// Remove a GitHub repository with its given prefix.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Prefix to remove"] prefix: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let prefix = ctx
        .data()
        .github_cards
        .remove_prefix(guild_id, &prefix)
        .await?;
    // Same reply whether or not the prefix existed
    ctx.say(format!(
        "A repository with the prefix ``{prefix}`` has been removed."
    ))
    .await?;
    Ok(())
}

/// List all prefixes for GitHub Cards in this server.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;
    let prefixes = ctx.data().github_cards.list_prefixes(guild_id.get()).await?;

    if prefixes.is_empty() {
        ctx.say("There are no configured GitHub repositories on this server.")
            .await?;
        return Ok(());
    }

    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.clone())
        .unwrap_or_else(|| guild_id.to_string());
    let lines = prefixes
        .iter()
        .map(|(prefix, repo)| format!("``{prefix}``: ``{}``", repo.name_with_owner()))
        .collect::<Vec<_>>()
        .join("\n");

    ctx.say(format!(
        "List of configured prefixes on **{guild_name}** server:\n{lines}"
    ))
    .await?;
    Ok(())
}

/// Learn how to set up GitHub cards.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn instructions(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(INSTRUCTIONS).await?;
    Ok(())
}

/// Set the GitHub token used for all lookups.
#[poise::command(slash_command, owners_only, ephemeral)]
pub async fn token(
    ctx: Context<'_>,
    #[description = "Personal access token"] token: String,
) -> Result<(), Error> {
    let data = ctx.data();
    data.credentials
        .store(GITHUB_SERVICE, GITHUB_TOKEN_KEY, &token)
        .await?;
    data.github_cards.update_token(token.trim())?;

    ctx.say("GitHub token updated.").await?;
    Ok(())
}

/// Search for issues in a GitHub repo.
///
/// Protip: You can also search issues via ``prefix#s <search_query>``!
#[poise::command(slash_command, guild_only, category = "GitHub Cards")]
pub async fn ghsearch(
    ctx: Context<'_>,
    #[description = "Configured repository prefix"] prefix: String,
    #[description = "What to search for"] search_query: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let cards = &ctx.data().github_cards;
    if !cards.is_ready() {
        // Interactions must be acknowledged within 3 seconds
        ctx.defer().await?;
        cards.wait_until_ready().await;
    }

    let repo = match cards.resolve_prefix(guild_id, &prefix).await {
        Ok(repo) => repo,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;
    let search = cards.search(&repo, &search_query).await?;
    ctx.send(poise::CreateReply::default().embed(search_embed(&format_search(&search))))
        .await?;
    Ok(())
}
