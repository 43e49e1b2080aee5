//! Error types for encoding and decoding wire events.

use thiserror::Error;

/// Errors raised at the JSON serialization boundary.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The payload was not valid JSON or did not match the event shape.
    #[error("Malformed event: {0}")]
    Malformed(String),

    /// The event could not be serialized.
    #[error("Failed to encode event: {0}")]
    Encode(String),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
