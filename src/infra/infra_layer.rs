// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "database.rs"]
pub mod database;

#[path = "antirp/sqlite_antirp_store.rs"]
pub mod antirp;

#[path = "credentials/sqlite_credential_store.rs"]
pub mod credentials;

#[path = "github_cards/mod.rs"]
pub mod github_cards;
