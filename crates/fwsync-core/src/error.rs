//! Error types for the firewall sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for fwsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the firewall sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Token exchange rejected by the issuer
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote name collision
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success status from a remote API
    #[error("Remote rejected request (status {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or description
        message: String,
    },

    /// Malformed response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Target is missing its credential or account identifier
    #[error("Configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a rejection error for a non-success status
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration-incomplete error
    pub fn incomplete(msg: impl Into<String>) -> Self {
        Self::ConfigurationIncomplete(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short, stable label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Authentication(_) => "auth",
            Self::Conflict(_) => "conflict",
            Self::Rejected { .. } => "rejected",
            Self::Parse(_) | Self::Json(_) => "parse",
            Self::ConfigurationIncomplete(_) => "incomplete",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
