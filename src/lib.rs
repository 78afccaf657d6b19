#![forbid(unsafe_code)]

//! `trackline`: WebSocket ingestion of geolocation telemetry.
//!
//! Clients open a WebSocket, start a tracking session, stream location
//! samples, and stop the session. Samples are validated and stored in
//! `SQLite`.

pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod protocol;
pub mod tracking;
pub mod ws;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
