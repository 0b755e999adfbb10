//! Error types for archive-timeline.
//!
//! This module defines the error taxonomy shared by the gateway, the fetch
//! client and the map renderer.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for archive-timeline operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Upstream Errors ===
    /// The upstream records API could not be reached or answered non-2xx.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the failure, including the status when known.
        message: String,
    },

    /// A response body did not have the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// What was wrong with the body.
        message: String,
    },

    // === Client Errors ===
    /// The gateway returned non-2xx or the request itself failed.
    #[error("failed to fetch records: {message}")]
    FetchFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// A page fetch was requested while another one is still in flight.
    #[error("a page fetch is already in flight")]
    FetchInFlight,

    /// A further page was requested but the last page carried no cursor.
    #[error("no more pages to fetch")]
    NoMorePages,

    // === Map Errors ===
    /// A hover listener was already attached to the map surface.
    #[error("hover listener already registered")]
    ListenerAlreadyRegistered,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to bind the gateway listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that couldn't be bound.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configured static directory is unusable.
    #[error("static directory {path} is not a directory")]
    StaticDir {
        /// Offending path.
        path: PathBuf,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Building or sending an HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for archive-timeline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an upstream unavailable error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a client fetch failure.
    #[must_use]
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the upstream side of the gateway.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::MalformedResponse { .. } | Self::Http(_)
        )
    }

    /// Check if this error is a caller sequencing mistake rather than a failure.
    #[must_use]
    pub fn is_sequencing(&self) -> bool {
        matches!(
            self,
            Self::FetchInFlight | Self::NoMorePages | Self::ListenerAlreadyRegistered
        )
    }
}
