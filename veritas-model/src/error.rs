//! Error types for answer generation.

use thiserror::Error;

/// Errors raised by a [`Generator`](crate::Generator).
#[derive(Debug, Error)]
pub enum ModelError {
    /// The generator is misconfigured (missing key, bad URL, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The backend rejected or failed the generation.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The request never produced a usable response.
    ///
    /// `retryable` is set for timeouts, connection failures, rate limits and
    /// server errors. Retrying is left to the caller.
    #[error("Request error ({provider}): {message}")]
    Request {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the same request may succeed later.
        retryable: bool,
    },

    /// A streamed chunk could not be decoded.
    #[error("Malformed stream from {provider}: {message}")]
    MalformedStream {
        /// The generator that produced the stream.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request { retryable: true, .. })
    }
}

/// A convenience result type for generation.
pub type Result<T> = std::result::Result<T, ModelError>;
