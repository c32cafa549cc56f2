// Framework hooks: command lifecycle breadcrumbs and the error handler.

use poise::serenity_prelude as serenity;

use crate::core::sentryio::{command_breadcrumb, CommandInvocation, CommandPhase};
use crate::discord::{Context, Data, Error};

fn render_value(value: &serenity::ResolvedValue<'_>) -> Option<String> {
    match value {
        serenity::ResolvedValue::String(s) => Some(s.to_string()),
        serenity::ResolvedValue::Integer(i) => Some(i.to_string()),
        serenity::ResolvedValue::Number(n) => Some(n.to_string()),
        serenity::ResolvedValue::Boolean(b) => Some(b.to_string()),
        serenity::ResolvedValue::User(user, _) => Some(user.id.to_string()),
        serenity::ResolvedValue::Channel(channel) => Some(channel.id.to_string()),
        serenity::ResolvedValue::Role(role) => Some(role.id.to_string()),
        serenity::ResolvedValue::Attachment(attachment) => Some(attachment.url.clone()),
        _ => None,
    }
}

/// Lift the breadcrumb fields out of a command context.
pub fn invocation(ctx: Context<'_>) -> CommandInvocation {
    let root = ctx.parent_commands().first().copied().unwrap_or(ctx.command());
    let arguments = match ctx {
        poise::Context::Application(app) => app
            .args
            .iter()
            .map(|option| (option.name.to_string(), render_value(&option.value)))
            .collect(),
        poise::Context::Prefix(_) => Vec::new(),
    };

    CommandInvocation {
        command_name: ctx.command().qualified_name.clone(),
        cog_name: root.category.clone(),
        author_id: ctx.author().id.get(),
        author_name: ctx.author().name.clone(),
        guild_id: ctx.guild_id().map(|id| id.get()),
        channel_id: ctx.channel_id().get(),
        arguments,
    }
}

pub async fn pre_command(ctx: Context<'_>) {
    tracing::info!(
        command = %ctx.command().qualified_name,
        author_id = ctx.author().id.get(),
        "Command invoked"
    );
    ctx.data()
        .sentry
        .add_breadcrumb(command_breadcrumb(&invocation(ctx), CommandPhase::Invoked));
}

pub async fn post_command(ctx: Context<'_>) {
    ctx.data()
        .sentry
        .add_breadcrumb(command_breadcrumb(&invocation(ctx), CommandPhase::Completed));
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    if let Some(ctx) = error.ctx() {
        tracing::error!(
            command = %ctx.command().qualified_name,
            error = %error,
            "Command failed"
        );
        ctx.data()
            .sentry
            .add_breadcrumb(command_breadcrumb(&invocation(ctx), CommandPhase::Failed));
    }

    if let Err(e) = poise::builtins::on_error(error).await {
        tracing::error!("Error while handling error: {}", e);
    }
}
