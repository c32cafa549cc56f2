// Core Sentry module - client lifecycle and breadcrumbs.

pub mod sentry_crumbs;
pub mod sentry_service;

pub use sentry_crumbs::*;
pub use sentry_service::*;
