//! services/client/src/app/state.rs
//!
//! Defines the application's shared state and how it is wired together.

use crate::config::Config;
use peerconnect_core::ports::{IdentityProvider, ProfileStore};
use peerconnect_core::resolution::{Attachment, ResolutionService};
use peerconnect_core::session::{SessionTracker, TrackerHandle};
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Flows)
//=========================================================================================

/// The shared application state, created once at startup and passed to every flow.
///
/// The tracker and resolution service are constructed here and handed down;
/// nothing in the crate reaches for a global session handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ProfileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tracker: SessionTracker,
    pub resolution: ResolutionService,
}

//=========================================================================================
// App (Owns the Background Wiring)
//=========================================================================================

/// A running application: the state plus the tasks and subscriptions that
/// keep it in sync with the identity provider.
pub struct App {
    pub state: Arc<AppState>,
    tracker_handle: TrackerHandle,
    resolution_attachment: Attachment,
}

impl App {
    /// Wires the tracker to the provider and the resolution service to the
    /// tracker. Must be called inside a Tokio runtime.
    pub fn start(
        config: Arc<Config>,
        store: Arc<dyn ProfileStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let tracker = SessionTracker::new();
        let resolution = ResolutionService::new(store.clone());

        // Attach resolution first so it sees the provider's initial report.
        let resolution_attachment = resolution.attach(&tracker);
        let tracker_handle = tracker.attach(identity.clone());
        info!(api_base = %config.api_base, "Application wired.");

        let state = Arc::new(AppState {
            config,
            store,
            identity,
            tracker,
            resolution,
        });

        Self {
            state,
            tracker_handle,
            resolution_attachment,
        }
    }

    /// Stops following the provider and discards in-flight lookups.
    pub async fn shutdown(self) {
        drop(self.resolution_attachment);
        self.tracker_handle.shutdown().await;
        info!("Application stopped.");
    }
}
