//! crates/peerconnect_core/src/resolution.rs
//!
//! Decides whether the signed-in identity already has a profile, and turns
//! that answer into a route. Every lookup is tagged with the generation it
//! was issued under; results for a superseded generation are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Profile, Session};
use crate::ports::{PortError, ProfileStore};
use crate::session::{SessionState, SessionTracker, Subscription};

//=========================================================================================
// Resolution State and Routing
//=========================================================================================

/// The answer to "does this identity have a profile?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No session, or the lookup for the current session has not answered yet.
    NotChecked,
    /// The lookup answered. `None` is the normal pre-onboarding state, not an error.
    Checked(Option<Profile>),
    /// The lookup failed. Never read this as "no profile".
    Failed(PortError),
}

impl Resolution {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Resolution::NotChecked)
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Resolution::Checked(Some(profile)) => Some(profile),
            _ => None,
        }
    }
}

/// The page a signed-in user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    EditProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Session or resolution still pending.
    Loading,
    Unauthenticated,
    CreateProfile,
    EditProfile(Profile),
    Dashboard(Profile),
    /// The lookup failed; offer a retry instead of guessing.
    Retry(PortError),
}

/// Picks the page to show from the session and resolution state.
pub fn select_route(session: &SessionState, resolution: &Resolution, requested: View) -> Route {
    match session {
        SessionState::Unknown => Route::Loading,
        SessionState::SignedOut => Route::Unauthenticated,
        SessionState::SignedIn(_) => match resolution {
            Resolution::NotChecked => Route::Loading,
            Resolution::Failed(e) => Route::Retry(e.clone()),
            Resolution::Checked(None) => Route::CreateProfile,
            Resolution::Checked(Some(profile)) => match requested {
                View::Dashboard => Route::Dashboard(profile.clone()),
                View::EditProfile => Route::EditProfile(profile.clone()),
            },
        },
    }
}

//=========================================================================================
// The Service
//=========================================================================================

struct Tracking {
    generation: u64,
    session: Option<Session>,
}

struct ResolutionInner {
    store: Arc<dyn ProfileStore>,
    tracking: Mutex<Tracking>,
    state: watch::Sender<Resolution>,
}

/// A lookup issued for one session under one generation.
struct Ticket {
    generation: u64,
    session: Session,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves sessions to profiles. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ResolutionService {
    inner: Arc<ResolutionInner>,
}

impl ResolutionService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let (state, _) = watch::channel(Resolution::NotChecked);
        Self {
            inner: Arc::new(ResolutionInner {
                store,
                tracking: Mutex::new(Tracking {
                    generation: 0,
                    session: None,
                }),
                state,
            }),
        }
    }

    /// Follows `tracker`: every session change starts a new resolution.
    /// Dropping the returned attachment stops following and discards any
    /// lookup still in flight.
    pub fn attach(&self, tracker: &SessionTracker) -> Attachment {
        let service = self.clone();
        let subscription = tracker.subscribe(move |state| service.on_session_change(state));
        Attachment {
            _subscription: subscription,
            service: self.clone(),
        }
    }

    /// Reacts to a session notification. Must be called inside a Tokio runtime
    /// because the lookup runs as a spawned task.
    pub fn on_session_change(&self, state: &SessionState) {
        match self.begin(state.session().cloned()) {
            Some(ticket) => {
                let service = self.clone();
                tokio::spawn(async move {
                    service.run(ticket).await;
                });
            }
            None => debug!("No session; resolution reset."),
        }
    }

    /// Resolves `session` inline and returns the resulting state, which is
    /// the lookup's outcome unless a newer session superseded it meanwhile.
    pub async fn resolve(&self, session: Session) -> Resolution {
        match self.begin(Some(session)) {
            Some(ticket) => self.run(ticket).await,
            None => self.current(),
        }
    }

    /// Re-reads the profile for the current session, e.g. on navigation or
    /// after a save. Without a session this is a no-op.
    pub async fn refresh(&self) -> Resolution {
        match self.begin_refresh(None) {
            Some(ticket) => self.run(ticket).await,
            None => self.current(),
        }
    }

    /// Like `refresh`, but only while the resolution still follows `session`.
    /// Returns `NotChecked` without a request once that session is gone.
    pub async fn refresh_for(&self, session: &Session) -> Resolution {
        match self.begin_refresh(Some(session)) {
            Some(ticket) => self.run(ticket).await,
            None => Resolution::NotChecked,
        }
    }

    /// The retry affordance offered from `Resolution::Failed`.
    pub async fn retry(&self) -> Resolution {
        self.refresh().await
    }

    /// Discards any lookup in flight and forgets the current session.
    pub fn invalidate(&self) {
        self.begin(None);
    }

    pub fn current(&self) -> Resolution {
        self.inner.state.borrow().clone()
    }

    /// The session the current resolution belongs to.
    pub fn session(&self) -> Option<Session> {
        lock(&self.inner.tracking).session.clone()
    }

    pub fn watch(&self) -> watch::Receiver<Resolution> {
        self.inner.state.subscribe()
    }

    /// Waits until the current lookup answers.
    ///
    /// Only meaningful while signed in; without a session the state stays
    /// `NotChecked` and this keeps waiting.
    pub async fn settled(&self) -> Resolution {
        let mut rx = self.inner.state.subscribe();
        let settled = match rx.wait_for(Resolution::is_settled).await {
            Ok(resolution) => resolution.clone(),
            Err(_) => self.current(),
        };
        settled
    }

    /// Waits until the resolution belongs to `session` and has answered.
    ///
    /// Covers the window where the tracker already reports a new session but
    /// its notification has not reached this service yet.
    pub async fn settled_for(&self, session: &Session) -> Resolution {
        let mut rx = self.inner.state.subscribe();
        loop {
            let _ = rx.borrow_and_update();
            let (owner, resolution) = self.snapshot();
            if resolution.is_settled() && owner.is_some_and(|s| s.same_identity(session)) {
                return resolution;
            }
            if rx.changed().await.is_err() {
                return self.current();
            }
        }
    }

    /// The session and resolution, read together.
    fn snapshot(&self) -> (Option<Session>, Resolution) {
        let tracking = lock(&self.inner.tracking);
        let resolution = self.inner.state.borrow().clone();
        (tracking.session.clone(), resolution)
    }

    pub fn route(&self, session: &SessionState, requested: View) -> Route {
        select_route(session, &self.current(), requested)
    }

    /// Starts a new generation. Any result still in flight becomes stale.
    fn begin(&self, session: Option<Session>) -> Option<Ticket> {
        let mut tracking = lock(&self.inner.tracking);
        tracking.generation += 1;
        tracking.session = session.clone();
        self.inner.state.send_replace(Resolution::NotChecked);
        session.map(|session| Ticket {
            generation: tracking.generation,
            session,
        })
    }

    /// Starts a new generation for the session already being followed. Reading
    /// the session and bumping the generation share one lock, so a sign-out
    /// cannot slip in between. With `expected`, the followed session must
    /// still be that identity.
    fn begin_refresh(&self, expected: Option<&Session>) -> Option<Ticket> {
        let mut tracking = lock(&self.inner.tracking);
        let session = tracking.session.clone()?;
        if expected.is_some_and(|e| !e.same_identity(&session)) {
            return None;
        }
        tracking.generation += 1;
        self.inner.state.send_replace(Resolution::NotChecked);
        Some(Ticket {
            generation: tracking.generation,
            session,
        })
    }

    async fn run(&self, ticket: Ticket) -> Resolution {
        debug!(generation = ticket.generation, email = %ticket.session.email, "Looking up profile.");

        let outcome = match self.inner.store.get_by_email(&ticket.session.email).await {
            Ok(found) => Resolution::Checked(found),
            Err(e) => {
                warn!(email = %ticket.session.email, error = %e, "Profile lookup failed.");
                Resolution::Failed(e)
            }
        };

        self.complete(ticket.generation, outcome);
        self.current()
    }

    fn complete(&self, generation: u64, outcome: Resolution) -> bool {
        let tracking = lock(&self.inner.tracking);
        if tracking.generation != generation {
            debug!(
                stale = generation,
                current = tracking.generation,
                "Discarding stale profile lookup."
            );
            return false;
        }

        match &outcome {
            Resolution::Checked(Some(p)) => info!(profile_id = p.id, "Profile resolved."),
            Resolution::Checked(None) => info!("No profile yet for this session."),
            _ => {}
        }
        self.inner.state.send_replace(outcome);
        true
    }
}

/// Keeps a `ResolutionService` following a tracker.
pub struct Attachment {
    _subscription: Subscription,
    service: ResolutionService,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.service.invalidate();
    }
}
