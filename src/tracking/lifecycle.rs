//! Tracking session state machine: `NonExistent → Active → Stopped`.
//!
//! `Stopped` is terminal. Stopping an already-stopped session is a
//! no-op that succeeds and keeps the original `end_time`.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::models::session::TrackingSession;
use crate::persistence::{self, SessionStore};
use crate::Result;

/// Start/stop operations over an injected [`SessionStore`].
#[derive(Clone)]
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
}

impl SessionLifecycle {
    /// Create a lifecycle bound to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Create a new active session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the store rejects the write,
    /// including when the session id already exists.
    #[instrument(name = "start_session", skip(self))]
    pub async fn start(&self, session_id: &str, delivery_id: &str) -> Result<TrackingSession> {
        let session = TrackingSession::start(
            session_id.to_owned(),
            delivery_id.to_owned(),
            persistence::now(),
        );
        self.store.create(&session).await?;
        info!("tracking session started");
        Ok(session)
    }

    /// Stop an active session.
    ///
    /// Concurrent stops race on a conditional write; exactly one sets
    /// `end_time` and every caller gets the stored record back.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionNotFound` if the session does not exist,
    /// or `AppError::Persistence` if the update fails.
    #[instrument(name = "stop_session", skip(self))]
    pub async fn stop(&self, session_id: &str) -> Result<TrackingSession> {
        if self.store.stop(session_id, persistence::now()).await? {
            info!("tracking session stopped");
        } else {
            debug!("session already stopped; ignoring repeated stop");
        }
        self.store.get_by_id(session_id).await
    }

    /// Whether the session currently accepts telemetry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionNotFound` if the session does not exist.
    pub async fn is_active(&self, session_id: &str) -> Result<bool> {
        Ok(self.store.get_by_id(session_id).await?.is_active)
    }

    /// Load a session record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionNotFound` if the session does not exist.
    pub async fn get(&self, session_id: &str) -> Result<TrackingSession> {
        self.store.get_by_id(session_id).await
    }
}
