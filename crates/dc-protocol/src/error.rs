//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding envelopes
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is valid JSON but not an object
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A required envelope field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// `packet_type` is present but not a string
    #[error("Field `packet_type` must be a string")]
    InvalidPacketType,

    /// Frame exceeds the configured maximum size
    #[error("Frame too large: {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
}
