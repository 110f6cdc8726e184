//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every configured IP detection service failed
    #[error("All IP detection services unavailable ({attempted} tried); check network connectivity")]
    AllServicesUnavailable {
        /// Number of services that were queried
        attempted: usize,
    },

    /// The provider rejected the access credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The target record does not exist at the provider
    #[error("Record not found: {rr}.{domain} (type: {record_type})")]
    RecordNotFound {
        rr: String,
        domain: String,
        record_type: String,
    },

    /// API-level error response from the provider
    #[error("Provider error ({provider}, HTTP {status}): {code} - {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// HTTP status of the response
        status: u16,
        /// Provider error code
        code: String,
        /// Error message
        message: String,
    },

    /// The provider refused a record update
    #[error("DNS record update failed, status {status}: {code} - {message}")]
    UpdateFailed {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport-level failure talking to an HTTP API
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local cache errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "record not found" error
    pub fn record_not_found(
        rr: impl Into<String>,
        domain: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Self {
        Self::RecordNotFound {
            rr: rr.into(),
            domain: domain.into(),
            record_type: record_type.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(
        provider: impl Into<String>,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Whether re-running cannot fix this error without operator action
    ///
    /// Configuration problems, rejected credentials and a missing target
    /// record all need a human; everything else may clear up by the next run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Authentication(_) | Self::RecordNotFound { .. }
        )
    }
}
