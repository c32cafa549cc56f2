// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "antirp/mod.rs"]
pub mod antirp;

#[path = "credentials/credential_service.rs"]
pub mod credentials;

#[path = "events/mod.rs"]
pub mod events;

#[path = "freshmeat/freshness_service.rs"]
pub mod freshmeat;

#[path = "github_cards/mod.rs"]
pub mod github_cards;

#[path = "massmove/massmove_service.rs"]
pub mod massmove;

#[path = "sentryio/mod.rs"]
pub mod sentryio;
