// Core AntiRP module - filters rich-presence invites out of guild channels.

pub mod antirp_models;
pub mod antirp_service;

pub use antirp_models::*;
pub use antirp_service::*;
