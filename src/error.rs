/*
[INPUT]:  Error sources (transport, decoding, configuration)
[OUTPUT]: Structured error types for the streaming client
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the market stream client
#[derive(Error, Debug)]
pub enum StreamError {
    /// Socket failed before reporting open
    #[error("connection failed before open: {0}")]
    Connect(String),

    /// Inbound frame decoded to something other than a JSON object
    #[error("inbound frame is not a JSON object")]
    InvalidFrame,

    /// Serialization/deserialization failed
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Endpoint URL could not be built from the configuration
    #[error("invalid endpoint URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl StreamError {
    /// Check whether the error is recovered by the reconnect path rather
    /// than surfaced to the caller as permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, StreamError::Connect(_) | StreamError::Decode(_) | StreamError::InvalidFrame)
    }
}

/// Result type alias for market stream operations
pub type Result<T> = std::result::Result<T, StreamError>;
