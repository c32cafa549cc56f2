// Raw gateway hook feeding the event relay.
//
// serenity models INTERACTION_CREATE itself, so it is serialised back to JSON; events serenity
// doesn't know arrive as `Event::Unknown` and are forwarded untouched.

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use crate::core::events::{EventRelay, RelayedEvent};

pub const INTERACTION_CREATE: &str = "interaction_create";

pub struct RawRelayHandler {
    relay: Arc<EventRelay>,
}

impl RawRelayHandler {
    pub fn new(relay: Arc<EventRelay>) -> Self {
        Self { relay }
    }
}

fn relayed_event(event: &serenity::Event) -> Option<RelayedEvent> {
    match event {
        serenity::Event::InteractionCreate(create) => {
            match serde_json::to_value(&create.interaction) {
                Ok(payload) => Some(RelayedEvent::new(INTERACTION_CREATE, payload)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialise interaction for the relay");
                    None
                }
            }
        }
        serenity::Event::Unknown(unknown) => {
            Some(RelayedEvent::new(&unknown.kind, unknown.value.clone()))
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl serenity::RawEventHandler for RawRelayHandler {
    async fn raw_event(&self, _ctx: serenity::Context, event: serenity::Event) {
        let Some(relayed) = relayed_event(&event) else {
            return;
        };
        if !self.relay.has_listeners(&relayed.kind) {
            return;
        }

        let delivered = self.relay.dispatch(&relayed).await;
        tracing::trace!(kind = %relayed.kind, delivered, "Relayed raw gateway event");
    }
}
