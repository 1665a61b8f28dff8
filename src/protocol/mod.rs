//! Wire types for the realtime control channel.

pub mod client_events;
pub mod models;
pub mod server_events;
