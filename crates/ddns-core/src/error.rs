//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate. The HTTP
//! boundary maps each variant to a status code; see `ddns-http`.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned for every authentication failure.
///
/// Unknown hosts and bad tokens are indistinguishable to the caller.
pub const UNAUTHORIZED_MESSAGE: &str = "Host not found or invalid token.";

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Authentication failed (unknown host or bad token)
    #[error("Host not found or invalid token.")]
    Unauthorized,

    /// Provider credentials are missing or unusable
    #[error("Provider credentials are not configured: {0}")]
    NotConfigured(String),

    /// Upstream DNS provider failure
    #[error("Provider error ({provider}){}: {message}", status_suffix(.status))]
    Provider {
        /// Provider name
        provider: String,
        /// Upstream HTTP status, if a response was received
        status: Option<u16>,
        /// Upstream message
        message: String,
    },

    /// A stored secret could not be decrypted
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" [HTTP {s}]")).unwrap_or_default()
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "not configured" error
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    /// Create a provider error without an upstream status (transport failure, timeout)
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a provider error carrying the upstream HTTP status
    pub fn provider_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a decryption error
    pub fn decryption(msg: impl Into<String>) -> Self {
        Self::Decryption(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure was caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Unauthorized | Self::NotFound(_) | Self::Conflict(_)
        )
    }
}
