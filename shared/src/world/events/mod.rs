pub mod error;
pub mod event_relay;
pub mod state_event_sink;
