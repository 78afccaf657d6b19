//! WebSocket transport: HTTP router, per-connection supervision, and
//! keepalive probing.

use serde::Serialize;

pub mod connection;
pub mod dispatch;
pub mod keepalive;
pub mod server;

pub use server::{router, serve, serve_with_listener, AppState};

/// Body of every error reported to a client, over WebSocket or HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrame {
    /// Human-readable error text.
    pub error: String,
}

impl ErrorFrame {
    /// Wrap an error message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
