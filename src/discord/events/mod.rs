pub mod lifecycle;
pub mod raw_relay;
