//! Validated, closed set of client commands.

use crate::models::message::{InboundMessage, LocationSample, MessageType, SessionStateSnapshot};
use crate::Result;

use super::validation::{self, ValidationError};

/// A message that passed validation, narrowed to what each branch needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a tracking session.
    Start {
        /// Session to create.
        session_id: String,
        /// Delivery from the client snapshot.
        delivery_id: String,
        /// Declared client start time, epoch milliseconds.
        declared_start_ms: Option<i64>,
    },
    /// Close a tracking session.
    Stop {
        /// Session to stop.
        session_id: String,
        /// Client snapshot, used only for duration logging.
        state: SessionStateSnapshot,
    },
    /// Record one telemetry sample.
    LocationUpdate {
        /// Session the sample belongs to.
        session_id: String,
        /// Delivery from the client snapshot.
        delivery_id: String,
        /// The sample itself.
        sample: LocationSample,
    },
}

impl Command {
    /// Session the command targets.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Start { session_id, .. }
            | Self::Stop { session_id, .. }
            | Self::LocationUpdate { session_id, .. } => session_id,
        }
    }
}

impl TryFrom<InboundMessage> for Command {
    type Error = crate::AppError;

    fn try_from(msg: InboundMessage) -> Result<Self> {
        validation::validate(&msg)?;

        let InboundMessage {
            message_type,
            session_id,
            data,
            state,
        } = msg;

        match (message_type, data) {
            (Some(MessageType::Start), _) => Ok(Self::Start {
                session_id,
                declared_start_ms: state.start_time_ms,
                delivery_id: state.delivery_id,
            }),
            (Some(MessageType::Stop), _) => Ok(Self::Stop { session_id, state }),
            (Some(MessageType::LocationUpdate), Some(sample)) => Ok(Self::LocationUpdate {
                session_id,
                delivery_id: state.delivery_id,
                sample,
            }),
            (Some(MessageType::LocationUpdate), None) => {
                Err(ValidationError::MissingLocationData.into())
            }
            (Some(MessageType::Unknown(tag)), _) => {
                Err(ValidationError::InvalidMessageType(Some(tag)).into())
            }
            (None, _) => Err(ValidationError::InvalidMessageType(None).into()),
        }
    }
}
