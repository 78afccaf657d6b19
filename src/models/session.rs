//! Tracking session model and lifecycle helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state derived from a [`TrackingSession`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting telemetry.
    Active,
    /// Stopped; terminal.
    Stopped,
}

/// Server-owned record of one bounded telemetry collection interval.
///
/// `end_time` is `Some` exactly when `is_active` is `false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    /// Client-chosen unique identifier.
    pub session_id: String,
    /// Delivery this session tracks.
    pub delivery_id: String,
    /// Server time at which `start` was accepted.
    pub start_time: DateTime<Utc>,
    /// Server time at which `stop` was accepted.
    pub end_time: Option<DateTime<Utc>>,
    /// Whether telemetry is still accepted.
    pub is_active: bool,
}

impl TrackingSession {
    /// Construct a freshly started, active session.
    #[must_use]
    pub fn start(session_id: String, delivery_id: String, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            delivery_id,
            start_time: now,
            end_time: None,
            is_active: true,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.is_active {
            SessionState::Active
        } else {
            SessionState::Stopped
        }
    }

    /// Transition to `Stopped`, stamping `end_time`.
    ///
    /// Returns `false` and leaves the record untouched when the session
    /// was already stopped.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.end_time = Some(now);
        true
    }
}
