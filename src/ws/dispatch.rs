//! Routes one decoded client frame to the tracking services.

use tracing::{debug, info};

use crate::protocol::{self, Command};
use crate::tracking::{LocationIngestor, SessionLifecycle};
use crate::Result;

/// Stateless frame handler shared by every connection.
#[derive(Clone)]
pub struct Dispatcher {
    sessions: SessionLifecycle,
    ingestor: LocationIngestor,
}

impl Dispatcher {
    /// Create a dispatcher over the tracking services.
    #[must_use]
    pub fn new(sessions: SessionLifecycle, ingestor: LocationIngestor) -> Self {
        Self { sessions, ingestor }
    }

    /// Parse, validate, and execute a single text frame.
    ///
    /// # Errors
    ///
    /// Returns the first parse, validation, domain, or persistence error.
    /// None of them are fatal to the connection.
    pub async fn handle_text(&self, text: &str) -> Result<()> {
        let message = protocol::parse_frame(text)?;
        let command = Command::try_from(message)?;
        self.dispatch(command).await
    }

    /// Execute an already validated command.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`SessionLifecycle`] and [`LocationIngestor`].
    pub async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Start {
                session_id,
                delivery_id,
                declared_start_ms,
            } => {
                info!(
                    session_id = %session_id,
                    delivery_id = %delivery_id,
                    declared_start_ms,
                    "start received"
                );
                self.sessions.start(&session_id, &delivery_id).await?;
            }
            Command::LocationUpdate {
                session_id,
                delivery_id,
                sample,
            } => {
                debug!(
                    session_id = %session_id,
                    latitude = sample.latitude,
                    longitude = sample.longitude,
                    accuracy = sample.accuracy,
                    timestamp_ms = sample.timestamp_ms,
                    speed = sample.speed,
                    heading = sample.heading,
                    "location update received"
                );
                self.ingestor
                    .record(&sample, &session_id, &delivery_id)
                    .await?;
            }
            Command::Stop { session_id, state } => {
                match state.reported_duration_ms() {
                    Some(duration_ms) => {
                        info!(session_id = %session_id, duration_ms, "stop received");
                    }
                    None => info!(session_id = %session_id, "stop received"),
                }
                self.sessions.stop(&session_id).await?;
            }
        }
        Ok(())
    }
}
