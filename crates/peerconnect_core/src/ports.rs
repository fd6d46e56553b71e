//! crates/peerconnect_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete identity provider and profile store.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{NewProfile, Profile, ProfileId, ProfilePatch, Session};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, identity SDK).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The store answered with a non-success status.
    #[error("Remote error {status}: {message}")]
    Remote { status: u16, message: String },
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// A success response whose body could not be understood.
    #[error("Malformed response: {0}")]
    Decode(String),
    /// Sign-in or sign-out failed at the identity provider.
    #[error("Identity provider error: {0}")]
    Provider(String),
    /// The adapter itself could not be built.
    #[error("Adapter setup failed: {0}")]
    Setup(String),
}

impl PortError {
    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PortError::Network(_) => true,
            PortError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The stream of session changes emitted by an identity provider.
/// `None` means signed out.
pub type SessionStream = Pin<Box<dyn Stream<Item = Option<Session>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create(&self, profile: &NewProfile) -> PortResult<Profile>;

    async fn list(&self) -> PortResult<Vec<Profile>>;

    async fn get_by_id(&self, id: ProfileId) -> PortResult<Profile>;

    async fn update(&self, id: ProfileId, patch: &ProfilePatch) -> PortResult<Profile>;

    async fn delete(&self, id: ProfileId) -> PortResult<()>;

    /// Finds the profile registered under `email`, ignoring case.
    ///
    /// Fetches the whole collection and scans it, so every lookup is O(n).
    /// Stores with an indexed query should override this.
    async fn get_by_email(&self, email: &str) -> PortResult<Option<Profile>> {
        let profiles = self.list().await?;
        Ok(profiles.into_iter().find(|p| p.has_email(email)))
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Runs the provider's interactive sign-in. Cancellation and network
    /// failures surface as `PortError::Provider`.
    async fn sign_in_interactive(&self) -> PortResult<Session>;

    async fn sign_out(&self) -> PortResult<()>;

    /// Subscribes to session changes. The first item is the provider's
    /// current state; dropping the stream unsubscribes.
    fn session_changes(&self) -> SessionStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_server_errors_are_transient() {
        assert!(PortError::Network("reset".to_string()).is_transient());
        assert!(PortError::Remote { status: 503, message: String::new() }.is_transient());
        assert!(!PortError::Remote { status: 404, message: String::new() }.is_transient());
        assert!(!PortError::Decode("eof".to_string()).is_transient());
        assert!(!PortError::Setup("no TLS backend".to_string()).is_transient());
    }
}
