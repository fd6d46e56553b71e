//! services/client/src/adapters/identity.rs
//!
//! A local identity provider that implements the `IdentityProvider` port.
//! It signs in as an identity taken from configuration instead of running a
//! hosted sign-in popup, which makes it suitable for development and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_stream::stream;
use async_trait::async_trait;
use chrono::Utc;
use peerconnect_core::domain::Session;
use peerconnect_core::ports::{IdentityProvider, PortError, PortResult, SessionStream};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::LocalIdentity;

struct ProviderState {
    current: Option<Session>,
    listeners: Vec<mpsc::UnboundedSender<Option<Session>>>,
}

/// An `IdentityProvider` backed by a configured identity.
pub struct LocalIdentityProvider {
    identity: Option<LocalIdentity>,
    state: Mutex<ProviderState>,
}

impl LocalIdentityProvider {
    /// Creates a signed-out provider that signs in as `identity`.
    pub fn new(identity: Option<LocalIdentity>) -> Self {
        Self {
            identity,
            state: Mutex::new(ProviderState {
                current: None,
                listeners: Vec::new(),
            }),
        }
    }

    /// Creates a provider that starts with a persisted session already signed in.
    pub fn restored(identity: LocalIdentity) -> Self {
        let provider = Self::new(Some(identity.clone()));
        provider.lock().current = Some(to_session(&identity));
        provider
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the new state and pushes it to every live subscriber, in order.
    fn emit(&self, session: Option<Session>) {
        let mut state = self.lock();
        state.current = session.clone();
        state
            .listeners
            .retain(|listener| listener.send(session.clone()).is_ok());
        debug!(subscribers = state.listeners.len(), "Session change emitted.");
    }
}

fn to_session(identity: &LocalIdentity) -> Session {
    Session {
        user_id: identity.user_id.clone(),
        email: identity.email.clone(),
        display_name: identity.display_name.clone(),
        signed_in_at: Utc::now(),
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_interactive(&self) -> PortResult<Session> {
        let identity = self.identity.as_ref().ok_or_else(|| {
            PortError::Provider("No identity is configured for local sign-in".to_string())
        })?;

        let session = to_session(identity);
        info!(email = %session.email, "Signed in with local identity.");
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> PortResult<()> {
        info!("Signing out.");
        self.emit(None);
        Ok(())
    }

    fn session_changes(&self) -> SessionStream {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut state = self.lock();
            // The current state is always the first item, as with hosted providers.
            let _ = tx.send(state.current.clone());
            state.listeners.push(tx);
        }

        Box::pin(stream! {
            while let Some(session) = rx.recv().await {
                yield session;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn identity() -> LocalIdentity {
        LocalIdentity {
            user_id: "u-1".to_string(),
            email: "alice@example.com".to_string(),
            display_name: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn stream_starts_with_current_state_then_follows_changes() {
        let provider = LocalIdentityProvider::new(Some(identity()));
        let mut changes = provider.session_changes();

        assert_eq!(changes.next().await, Some(None));

        provider.sign_in_interactive().await.unwrap();
        provider.sign_out().await.unwrap();

        let signed_in = changes.next().await.unwrap().unwrap();
        assert_eq!(signed_in.email, "alice@example.com");
        assert_eq!(changes.next().await, Some(None));
    }

    #[tokio::test]
    async fn sign_in_without_identity_fails() {
        let provider = LocalIdentityProvider::new(None);
        let err = provider.sign_in_interactive().await.unwrap_err();
        assert!(matches!(err, PortError::Provider(_)));
    }

    #[tokio::test]
    async fn restored_session_is_reported_first() {
        let provider = LocalIdentityProvider::restored(identity());
        let mut changes = provider.session_changes();
        let first = changes.next().await.unwrap();
        assert_eq!(first.map(|s| s.user_id), Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn dropped_streams_are_pruned() {
        let provider = LocalIdentityProvider::new(Some(identity()));
        let changes = provider.session_changes();
        drop(changes);
        provider.sign_in_interactive().await.unwrap();
        assert!(provider.lock().listeners.is_empty());
    }
}
