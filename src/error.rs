//! Error types for the VÍGIA speech service

use std::time::Duration;

use thiserror::Error;

/// Result type alias for speech service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the speech service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Text rejected before synthesis was attempted
    #[error("invalid text: {0}")]
    InvalidText(String),

    /// Synthesis failed after exhausting retries
    #[error("failed to get audio: {0}")]
    Synthesis(#[source] SynthesisFailure),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<SynthesisFailure> for Error {
    fn from(failure: SynthesisFailure) -> Self {
        Self::Synthesis(failure)
    }
}

/// Classified failure of a single synthesis request
///
/// Cloneable because every caller waiting on the same text receives the
/// same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisFailure {
    /// Network unreachable, DNS failure, connection reset
    #[error("network error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status
    #[error("speech endpoint rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The queued job was discarded before it settled
    #[error("synthesis job dropped before completion")]
    Dropped,
}

impl SynthesisFailure {
    /// Whether this failure originated below the HTTP layer
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
