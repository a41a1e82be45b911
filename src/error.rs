//! Error types for helios-client
//!
//! This module provides the single error type used throughout the library and
//! its classification into the failure categories callers reason about:
//! - Transport failures (connection, timeout, non-2xx responses)
//! - Decode failures (JSON or image payloads that cannot be parsed)
//! - Sizing failures (the first page of a paginated query is unusable)
//! - Usage errors (invalid filters, windows, or configuration)
//!
//! Truncation of an index query by the server-side skip ceiling is *not* an
//! error. It is reported through [`crate::aggregate::Truncation`].

use thiserror::Error;

/// Result type alias for helios-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for helios-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "HELIOS_SSL_VERIFY")
        key: Option<String>,
    },

    /// A filter, window, or option combination that can never produce a valid request
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Connection, timeout, redirect, or body transfer failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// Response body is not the expected JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// JSON decoded, but lacks what pagination needs
    #[error("malformed page from {url}: {reason}")]
    MalformedPage {
        /// Request URL
        url: String,
        /// What was missing or mistyped
        reason: String,
    },

    /// Media payload could not be decoded into an image
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error (persisting media, creating output directories)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The first page of a paginated query failed, so no sizing is possible
    #[error("could not size query {query}: {source}")]
    Sizing {
        /// Request URL of the first window
        query: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A subsequent page failed on the strict pagination path
    #[error("page at skip {skip} failed: {source}")]
    PageFailed {
        /// Offset of the failed window
        skip: u64,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A worker panicked; the panic was contained at the task boundary
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`]
///
/// Lets callers tell "the network let us down" apart from "the payload was
/// garbage" and from "the call itself was wrong".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, timeout, non-2xx, or local I/O failure
    Transport,
    /// Payload could not be parsed as expected
    Decode,
    /// First page of a paginated query failed
    Sizing,
    /// Invalid input or configuration
    Usage,
    /// Anything else, including contained panics
    Internal,
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network(e) if e.is_decode() => ErrorCategory::Decode,
            Error::Network(_) | Error::Http { .. } | Error::Io(_) => ErrorCategory::Transport,
            Error::Serialization(_) | Error::MalformedPage { .. } | Error::Image(_) => {
                ErrorCategory::Decode
            }
            Error::Sizing { .. } => ErrorCategory::Sizing,
            Error::InvalidQuery(_) | Error::Config { .. } => ErrorCategory::Usage,
            // A failed subsequent page inherits the category of its cause
            Error::PageFailed { source, .. } => source.category(),
            Error::TaskPanicked(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Shorthand for building an [`Error::Config`]
    pub(crate) fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }
}
