pub mod event_relay;

pub use event_relay::*;
