// Breadcrumb builders for command lifecycle and interaction events.

use std::collections::BTreeMap as Map;

use sentry::{Breadcrumb, Level};
use serde_json::Value;

const NONE: &str = "None";

/// Which lifecycle hook produced the crumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Invoked,
    Completed,
    Failed,
}

impl CommandPhase {
    fn category(self) -> &'static str {
        match self {
            CommandPhase::Invoked => "on_command",
            CommandPhase::Completed => "on_command_completion",
            CommandPhase::Failed => "on_command_error",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            CommandPhase::Invoked => "ran",
            CommandPhase::Completed => "completed",
            CommandPhase::Failed => "failed",
        }
    }

    fn level(self) -> Level {
        match self {
            CommandPhase::Failed => Level::Error,
            _ => Level::Info,
        }
    }
}

/// Everything a command breadcrumb records, lifted out of the framework context.
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    pub command_name: String,
    pub cog_name: Option<String>,
    pub author_id: u64,
    pub author_name: String,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    /// Argument name and rendered value, `None` when the argument was omitted
    pub arguments: Vec<(String, Option<String>)>,
}

impl CommandInvocation {
    fn crumb_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("command_name".into(), self.command_name.clone().into());
        data.insert(
            "cog_name".into(),
            self.cog_name.clone().unwrap_or_else(|| NONE.to_string()).into(),
        );
        data.insert("author_id".into(), self.author_id.into());
        data.insert("guild_id".into(), optional_id(self.guild_id));
        data.insert("channel_id".into(), self.channel_id.into());
        for (name, value) in &self.arguments {
            data.insert(
                format!("command_arg_{name}"),
                value.clone().unwrap_or_else(|| NONE.to_string()).into(),
            );
        }
        data
    }
}

pub fn command_breadcrumb(invocation: &CommandInvocation, phase: CommandPhase) -> Breadcrumb {
    Breadcrumb {
        ty: "user".into(),
        category: Some(phase.category().into()),
        level: phase.level(),
        message: Some(format!(
            "Command \"{}\" {} for {} ({})",
            invocation.command_name,
            phase.verb(),
            invocation.author_name,
            invocation.author_id
        )),
        data: invocation.crumb_data(),
        ..Default::default()
    }
}

/// Fields pulled from a raw `INTERACTION_CREATE` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionInfo {
    pub interaction_id: u64,
    pub channel_id: Option<u64>,
    pub guild_id: Option<u64>,
    pub user_id: Option<u64>,
    pub user_name: String,
    pub message_id: Option<u64>,
}

impl InteractionInfo {
    /// Returns `None` when the payload has no usable interaction id.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let interaction_id = snowflake(payload.get("id"))?;

        // Guild interactions carry the user under `member`, DMs carry it at the top level
        let user = payload
            .get("member")
            .and_then(|member| member.get("user"))
            .or_else(|| payload.get("user"));

        Some(Self {
            interaction_id,
            channel_id: snowflake(payload.get("channel_id")),
            guild_id: snowflake(payload.get("guild_id")),
            user_id: user.and_then(|u| snowflake(u.get("id"))),
            user_name: user
                .and_then(|u| u.get("username"))
                .and_then(Value::as_str)
                .unwrap_or(NONE)
                .to_string(),
            message_id: payload
                .get("message")
                .and_then(|message| snowflake(message.get("id"))),
        })
    }
}

pub fn interaction_breadcrumb(info: &InteractionInfo) -> Breadcrumb {
    let mut data = Map::new();
    data.insert("interaction_id".into(), info.interaction_id.into());
    data.insert("channel_id".into(), optional_id(info.channel_id));
    data.insert("guild_id".into(), optional_id(info.guild_id));
    data.insert("user_id".into(), optional_id(info.user_id));
    data.insert("message_id".into(), optional_id(info.message_id));

    let user_id = info
        .user_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| NONE.to_string());

    Breadcrumb {
        ty: "user".into(),
        category: Some("on_interaction".into()),
        level: Level::Info,
        message: Some(format!(
            "Interaction \"{}\" ran for {} ({})",
            info.interaction_id, info.user_name, user_id
        )),
        data,
        ..Default::default()
    }
}

fn optional_id(id: Option<u64>) -> Value {
    id.map(Value::from).unwrap_or_else(|| NONE.into())
}

/// Discord sends snowflakes as strings.
fn snowflake(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
