// Event relay - re-dispatches raw gateway payloads as named bot events.
//
// Listeners register under a lower-cased event name (`interaction_create`, ...) and receive the
// untouched JSON payload. Unregistering is the unload counterpart of registering.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// A raw gateway event under its bot-facing name.
#[derive(Debug, Clone)]
pub struct RelayedEvent {
    pub kind: String,
    pub payload: Value,
}

impl RelayedEvent {
    pub fn new(kind: impl AsRef<str>, payload: Value) -> Self {
        Self {
            kind: kind.as_ref().to_lowercase(),
            payload,
        }
    }
}

#[async_trait]
pub trait RawEventListener: Send + Sync {
    async fn on_event(&self, event: &RelayedEvent);
}

/// Registry of listeners keyed by event name, then by listener name.
#[derive(Default)]
pub struct EventRelay {
    listeners: DashMap<String, DashMap<String, Arc<dyn RawEventListener>>>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event`. A listener with the same name is replaced.
    pub fn register(&self, event: &str, name: &str, listener: Arc<dyn RawEventListener>) {
        self.listeners
            .entry(event.to_lowercase())
            .or_default()
            .insert(name.to_string(), listener);
        tracing::debug!(event, listener = name, "Registered raw event listener");
    }

    /// Returns `true` when a listener was actually removed.
    pub fn unregister(&self, event: &str, name: &str) -> bool {
        let event = event.to_lowercase();
        let removed = self
            .listeners
            .get(&event)
            .and_then(|listeners| listeners.remove(name))
            .is_some();
        self.listeners.remove_if(&event, |_, listeners| listeners.is_empty());
        removed
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .get(&event.to_lowercase())
            .is_some_and(|listeners| !listeners.is_empty())
    }

    /// Deliver an event to every listener registered for its kind. Returns how many ran.
    pub async fn dispatch(&self, event: &RelayedEvent) -> usize {
        // Clone the handles out so no map guard is held across an await
        let targets: Vec<Arc<dyn RawEventListener>> = match self.listeners.get(&event.kind) {
            Some(listeners) => listeners.iter().map(|l| Arc::clone(l.value())).collect(),
            None => return 0,
        };

        for listener in &targets {
            listener.on_event(event).await;
        }
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RawEventListener for CountingListener {
        async fn on_event(&self, _event: &RelayedEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_registered_listener() {
        let relay = EventRelay::new();
        let listener = Arc::new(CountingListener::default());
        relay.register("INTERACTION_CREATE", "crumbs", listener.clone());

        let event = RelayedEvent::new("INTERACTION_CREATE", json!({"id": "1"}));
        assert_eq!(event.kind, "interaction_create");
        assert_eq!(relay.dispatch(&event).await, 1);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_events_are_not_delivered() {
        let relay = EventRelay::new();
        let listener = Arc::new(CountingListener::default());
        relay.register("interaction_create", "crumbs", listener.clone());

        let event = RelayedEvent::new("typing_start", json!({}));
        assert_eq!(relay.dispatch(&event).await, 0);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let relay = EventRelay::new();
        let listener = Arc::new(CountingListener::default());
        relay.register("interaction_create", "crumbs", listener.clone());

        assert!(relay.unregister("interaction_create", "crumbs"));
        assert!(!relay.unregister("interaction_create", "crumbs"));
        assert!(!relay.has_listeners("interaction_create"));

        let event = RelayedEvent::new("interaction_create", json!({}));
        assert_eq!(relay.dispatch(&event).await, 0);
    }

    #[tokio::test]
    async fn test_same_name_replaces_listener() {
        let relay = EventRelay::new();
        let first = Arc::new(CountingListener::default());
        let second = Arc::new(CountingListener::default());
        relay.register("interaction_create", "crumbs", first.clone());
        relay.register("interaction_create", "crumbs", second.clone());

        let event = RelayedEvent::new("interaction_create", json!({}));
        assert_eq!(relay.dispatch(&event).await, 1);
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }
}
