//! Tracking session services.

pub mod ingestor;
pub mod lifecycle;

pub use ingestor::LocationIngestor;
pub use lifecycle::SessionLifecycle;
