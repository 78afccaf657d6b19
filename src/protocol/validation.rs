//! Message and coordinate validation.
//!
//! Rules are checked in a fixed order and the first failure wins, so a
//! client always sees the most fundamental problem with its message.

use std::fmt::{Display, Formatter};

use crate::models::message::{InboundMessage, LocationSample, MessageType};

const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Specific reason a decoded message was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `type` absent or not one of the known tags.
    InvalidMessageType(Option<String>),
    /// `sessionId` absent or empty.
    MissingSessionId,
    /// `location_update` without a `data` payload.
    MissingLocationData,
    /// Latitude outside `[-90, 90]`.
    InvalidLatitude(f64),
    /// Longitude outside `[-180, 180]`.
    InvalidLongitude(f64),
    /// Negative accuracy radius.
    InvalidAccuracy(f64),
    /// Negative speed.
    InvalidSpeed(f64),
    /// Negative heading.
    InvalidHeading(f64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMessageType(Some(tag)) => write!(f, "invalid message type: {tag}"),
            Self::InvalidMessageType(None) => write!(f, "invalid message type: missing"),
            Self::MissingSessionId => write!(f, "missing session id"),
            Self::MissingLocationData => write!(f, "missing location data"),
            Self::InvalidLatitude(v) => write!(f, "latitude must be between -90 and 90, got {v}"),
            Self::InvalidLongitude(v) => {
                write!(f, "longitude must be between -180 and 180, got {v}")
            }
            Self::InvalidAccuracy(v) => write!(f, "accuracy cannot be negative, got {v}"),
            Self::InvalidSpeed(v) => write!(f, "speed cannot be negative, got {v}"),
            Self::InvalidHeading(v) => write!(f, "heading cannot be negative, got {v}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a decoded message.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(msg: &InboundMessage) -> Result<(), ValidationError> {
    match &msg.message_type {
        None => return Err(ValidationError::InvalidMessageType(None)),
        Some(MessageType::Unknown(tag)) => {
            return Err(ValidationError::InvalidMessageType(Some(tag.clone())));
        }
        Some(_) => {}
    }

    if msg.session_id.is_empty() {
        return Err(ValidationError::MissingSessionId);
    }

    if msg.message_type == Some(MessageType::LocationUpdate) && msg.data.is_none() {
        return Err(ValidationError::MissingLocationData);
    }

    if let Some(sample) = &msg.data {
        validate_sample(sample)?;
    }

    Ok(())
}

/// Check coordinate, accuracy, speed, and heading bounds of a sample.
///
/// Non-finite values fail the range check for their field.
///
/// # Errors
///
/// Returns the first out-of-range field as a [`ValidationError`].
pub fn validate_sample(sample: &LocationSample) -> Result<(), ValidationError> {
    if !LATITUDE_RANGE.contains(&sample.latitude) {
        return Err(ValidationError::InvalidLatitude(sample.latitude));
    }
    if !LONGITUDE_RANGE.contains(&sample.longitude) {
        return Err(ValidationError::InvalidLongitude(sample.longitude));
    }
    if !is_non_negative(sample.accuracy) {
        return Err(ValidationError::InvalidAccuracy(sample.accuracy));
    }
    if let Some(speed) = sample.speed.filter(|v| !is_non_negative(*v)) {
        return Err(ValidationError::InvalidSpeed(speed));
    }
    if let Some(heading) = sample.heading.filter(|v| !is_non_negative(*v)) {
        return Err(ValidationError::InvalidHeading(heading));
    }
    Ok(())
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
