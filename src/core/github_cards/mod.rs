// Core GitHub cards module - issue references, prefix cache and card layout.

pub mod cards_formatting;
pub mod cards_models;
pub mod cards_service;
pub mod prefix_matcher;
pub mod query_builder;
pub mod readiness;

pub use cards_formatting::*;
pub use cards_models::*;
pub use cards_service::*;
