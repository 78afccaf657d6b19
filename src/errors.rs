//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use crate::protocol::validation::ValidationError;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Message sent to clients in place of storage error details.
pub const PERSISTENCE_FAILURE_MESSAGE: &str = "persistence failure";

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Inbound frame could not be decoded as a protocol message.
    MalformedPayload(String),
    /// Decoded message violated a protocol or coordinate rule.
    Validation(ValidationError),
    /// Referenced tracking session does not exist.
    SessionNotFound(String),
    /// Referenced tracking session has already been stopped.
    SessionInactive(String),
    /// Store rejected or failed a read or write.
    Persistence(String),
    /// WebSocket send or receive failure.
    Transport(String),
    /// File-system or socket I/O failure during bootstrap.
    Io(String),
}

impl AppError {
    /// Text reported to the client in an `{"error": ...}` frame.
    ///
    /// Storage failures are reported generically; every other variant
    /// uses its display form.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Persistence(_) => PERSISTENCE_FAILURE_MESSAGE.to_owned(),
            other => other.to_string(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::MalformedPayload(msg) => write!(f, "malformed payload: {msg}"),
            Self::Validation(err) => write!(f, "validation: {err}"),
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionInactive(id) => write!(f, "session inactive: {id}"),
            Self::Persistence(msg) => write!(f, "persistence: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
