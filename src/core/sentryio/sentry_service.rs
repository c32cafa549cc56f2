// Sentry service - owns the error-reporting client and the breadcrumbs fed into it.
//
// The client is bound to the process-wide hub so breadcrumbs recorded from any task land in the
// same scope. Re-initialising always closes the previous client first.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use sentry::{Breadcrumb, Client, ClientOptions, Hub};
use thiserror::Error;

use super::sentry_crumbs::{interaction_breadcrumb, InteractionInfo};
use crate::core::events::{RawEventListener, RelayedEvent};

#[derive(Debug, Error)]
pub enum SentryError {
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),
}

struct ActiveClient {
    dsn: String,
    client: Arc<Client>,
}

#[derive(Default)]
pub struct SentryService {
    active: Mutex<Option<ActiveClient>>,
}

impl SentryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveClient>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// (Re)initialise the client. Returns `false` when the DSN is empty and nothing was started.
    pub fn init(&self, dsn: &str) -> Result<bool, SentryError> {
        self.close();

        let dsn = dsn.trim();
        if dsn.is_empty() {
            tracing::error!("No valid DSN found");
            return Ok(false);
        }

        let parsed = dsn
            .parse::<sentry::types::Dsn>()
            .map_err(|e| SentryError::InvalidDsn(e.to_string()))?;

        let options = ClientOptions {
            dsn: Some(parsed),
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            shutdown_timeout: Duration::ZERO,
            ..Default::default()
        };
        let client = Arc::new(Client::with_options(sentry::apply_defaults(options)));
        Hub::main().bind_client(Some(Arc::clone(&client)));

        tracing::info!(dsn, "Initializing Sentry");
        *self.active() = Some(ActiveClient {
            dsn: dsn.to_string(),
            client,
        });
        Ok(true)
    }

    pub fn close(&self) {
        if let Some(active) = self.active().take() {
            tracing::info!("Closing Sentry client");
            active.client.close(Some(Duration::ZERO));
            Hub::main().bind_client(None);
        }
    }

    /// The DSN of the running client, if any.
    pub fn status(&self) -> Option<String> {
        self.active().as_ref().map(|active| active.dsn.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.active().is_some()
    }

    pub fn add_breadcrumb(&self, crumb: Breadcrumb) {
        if self.is_initialized() {
            Hub::main().add_breadcrumb(crumb);
        }
    }
}

/// Relay listener that turns every raw interaction into a breadcrumb.
pub struct InteractionCrumbs {
    sentry: Arc<SentryService>,
}

impl InteractionCrumbs {
    pub const NAME: &'static str = "sentryio";

    pub fn new(sentry: Arc<SentryService>) -> Self {
        Self { sentry }
    }
}

#[async_trait]
impl RawEventListener for InteractionCrumbs {
    async fn on_event(&self, event: &RelayedEvent) {
        if !self.sentry.is_initialized() {
            return;
        }
        match InteractionInfo::from_payload(&event.payload) {
            Some(info) => self.sentry.add_breadcrumb(interaction_breadcrumb(&info)),
            None => tracing::debug!("Interaction payload without an id, skipping breadcrumb"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dsn_leaves_client_uninitialized() {
        let service = SentryService::new();
        assert!(!service.init("   ").unwrap());
        assert!(service.status().is_none());
    }

    #[test]
    fn test_malformed_dsn_is_rejected() {
        let service = SentryService::new();
        assert!(matches!(
            service.init("not a dsn"),
            Err(SentryError::InvalidDsn(_))
        ));
        assert!(!service.is_initialized());
    }

    #[test]
    fn test_init_then_close() {
        let service = SentryService::new();
        let dsn = "https://public@sentry.example.com/1";

        assert!(service.init(dsn).unwrap());
        assert_eq!(service.status().as_deref(), Some(dsn));

        service.close();
        assert!(service.status().is_none());
    }
}
