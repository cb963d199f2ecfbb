//! Shared error and result types
//!
//! Every failure path in the engine returns a value from this taxonomy;
//! nothing here is allowed to abort the process. The HTTP layer maps each
//! variant to a status code and the action channel maps it to a
//! `{success: false, message}` envelope.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy for the emulation engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// An entity id (invitation, chat, post, reaction, comment) did not
    /// resolve. Maps to HTTP 404. The display string doubles as the
    /// user-facing message, e.g. `NotFound("Chat")` -> "Chat not found".
    #[error("{0} not found")]
    NotFound(String),

    /// Input rejected before any mutation was applied. Maps to HTTP 400.
    #[error("{0}")]
    InvalidInput(String),

    /// Explicit proxy passthrough failed in transport or at the upstream.
    /// Maps to HTTP 502. Cache-through reads never raise this; they degrade
    /// to a silent miss instead.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// A feature needing upstream settings was invoked without them.
    /// Maps to HTTP 501 for proxy passthrough.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Persistence failure (filesystem or serialization).
    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Shorthand for the common "X not found" case
    pub fn not_found(what: &str) -> Self {
        EngineError::NotFound(what.to_string())
    }

    /// Shorthand for input validation failures
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_matches_envelope() {
        let err = EngineError::not_found("Chat");
        assert_eq!(err.to_string(), "Chat not found");
    }

    #[test]
    fn test_invalid_input_is_verbatim() {
        let err = EngineError::invalid("Message text is required");
        assert_eq!(err.to_string(), "Message text is required");
    }
}
