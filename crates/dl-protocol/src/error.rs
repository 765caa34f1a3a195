//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding envelopes
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Inbound bytes were not well-formed JSON
    #[error("Malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A required field was absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A known message type carried fields of the wrong shape
    #[error("Invalid '{kind}' message: {source}")]
    InvalidField {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// Inbound message exceeds the configured size limit
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Outbound envelope could not be serialized
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}
