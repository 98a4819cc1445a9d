//! Hosted backend access: realtime change feeds and table reads
//!
//! The backend speaks Phoenix channels over a websocket for row changes
//! and a PostgREST-style HTTP interface for queries.

pub mod config;
pub mod protocol;
pub mod rest;
pub mod subscription;

pub use config::BackendConfig;
pub use protocol::{ChangeKind, PhoenixMessage, RowChange};
pub use rest::{TableClient, HISTORY_LIMIT};
pub use subscription::{ReadingHandler, RealtimeClient, RealtimeSubscription};

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Decode error: {0}")]
    Decode(String),
}
