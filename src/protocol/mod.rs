//! Application message protocol: decoding, validation, and command mapping.
//!
//! A frame goes through three steps before it reaches a service:
//!
//! | Step                   | Failure                          |
//! |------------------------|----------------------------------|
//! | [`parse_frame`]        | [`AppError::MalformedPayload`]   |
//! | [`validation::validate`] | [`AppError::Validation`]       |
//! | [`Command::try_from`]  | either of the above              |

pub mod command;
pub mod validation;

pub use command::Command;

use crate::models::message::InboundMessage;
use crate::{AppError, Result};

/// Decode one text frame into an [`InboundMessage`].
///
/// # Errors
///
/// Returns `AppError::MalformedPayload` if the text is not JSON or does
/// not match the message schema.
pub fn parse_frame(text: &str) -> Result<InboundMessage> {
    serde_json::from_str(text).map_err(|err| AppError::MalformedPayload(err.to_string()))
}
