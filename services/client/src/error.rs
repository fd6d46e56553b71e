//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use peerconnect_core::form::ValidationError;
use peerconnect_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The profile draft was rejected before reaching the store.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The operation needs a signed-in session.
    #[error("Not signed in")]
    NotSignedIn,

    /// Represents a standard Input/Output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether the user should be offered a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Port(e) if e.is_transient())
    }
}
