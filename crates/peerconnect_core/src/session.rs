//! crates/peerconnect_core/src/session.rs
//!
//! The identity session tracker. It follows the identity provider's session
//! stream and republishes it as a single current value plus ordered
//! notifications to registered observers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::Session;
use crate::ports::IdentityProvider;

/// What the app knows about the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The provider has not reported yet. Render a loading placeholder.
    Unknown,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn from_provider(session: Option<Session>) -> Self {
        match session {
            Some(session) => SessionState::SignedIn(session),
            None => SessionState::SignedOut,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

type Observer = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Registration {
    id: u64,
    active: Arc<AtomicBool>,
    observer: Observer,
}

struct TrackerInner {
    state: watch::Sender<SessionState>,
    observers: Mutex<Vec<Registration>>,
    // Serializes publishing so observers see changes in provider order.
    dispatch: Mutex<()>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks the current session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<TrackerInner>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    /// Creates a tracker in the `Unknown` state that is not yet fed by a provider.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            inner: Arc::new(TrackerInner {
                state,
                observers: Mutex::new(Vec::new()),
                dispatch: Mutex::new(()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Starts following `provider`. The returned handle stops the pump task.
    pub fn attach(&self, provider: Arc<dyn IdentityProvider>) -> TrackerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tracker = self.clone();

        let task = tokio::spawn(async move {
            let mut changes = provider.session_changes();
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Session tracker detached.");
                        break;
                    }
                    next = changes.next() => match next {
                        Some(session) => tracker.publish(session),
                        None => {
                            debug!("Identity provider closed its session stream.");
                            break;
                        }
                    }
                }
            }
        });

        TrackerHandle { cancel, task }
    }

    /// Notifies observers in registration order, then replaces the current
    /// snapshot. Anyone reading `state` or a watcher therefore sees a new
    /// session only after every observer has handled it.
    ///
    /// Observers must not call `publish` or `subscribe` from inside their
    /// callback; both take the dispatch lock and would deadlock.
    pub fn publish(&self, session: Option<Session>) {
        let _ordered = lock(&self.inner.dispatch);
        let state = SessionState::from_provider(session);

        match &state {
            SessionState::SignedIn(s) => info!(user_id = %s.user_id, email = %s.email, "Session signed in."),
            _ => info!("Session signed out."),
        }

        let snapshot: Vec<(Arc<AtomicBool>, Observer)> = lock(&self.inner.observers)
            .iter()
            .map(|r| (r.active.clone(), r.observer.clone()))
            .collect();
        for (active, observer) in snapshot {
            if active.load(Ordering::SeqCst) {
                observer(&state);
            }
        }
        self.inner.state.send_replace(state);
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_known(&self) -> bool {
        self.inner.state.borrow().is_known()
    }

    /// The signed-in session, or `None` when signed out.
    ///
    /// Also `None` while the state is still unknown; check `is_known` first
    /// when the difference matters.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    /// Waits for the provider's first report and returns it.
    pub async fn known(&self) -> SessionState {
        let mut rx = self.inner.state.subscribe();
        let known = match rx.wait_for(SessionState::is_known).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so it cannot be dropped while we wait.
            Err(_) => self.state(),
        };
        known
    }

    /// A receiver for async consumers that only need the latest state.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Registers an observer for every session change.
    ///
    /// If the state is already known the observer is invoked once immediately
    /// with it. Dropping or unsubscribing the returned handle stops all
    /// further invocations.
    ///
    /// The observer runs under the dispatch lock, here and in `publish`. It
    /// must not call `subscribe` or `publish` on this tracker. Dropping a
    /// `Subscription` from inside it is fine.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let _ordered = lock(&self.inner.dispatch);
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        let observer: Observer = Arc::new(observer);

        lock(&self.inner.observers).push(Registration {
            id,
            active: active.clone(),
            observer: observer.clone(),
        });

        let current = self.state();
        if current.is_known() {
            observer(&current);
        }

        Subscription {
            id,
            active,
            tracker: Arc::downgrade(&self.inner),
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }
}

/// Keeps an observer registered. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    tracker: Weak<TrackerInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(inner) = self.tracker.upgrade() {
            lock(&inner.observers).retain(|r| r.id != self.id);
        }
    }
}

/// Stops a tracker's pump task.
pub struct TrackerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    fn session(user: &str) -> Session {
        Session {
            user_id: user.to_string(),
            email: format!("{user}@x.com"),
            display_name: None,
            signed_in_at: Utc::now(),
        }
    }

    #[test]
    fn starts_unknown() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.state(), SessionState::Unknown);
        assert!(!tracker.is_known());
        assert!(tracker.current_session().is_none());
    }

    #[test]
    fn observers_see_changes_in_order() {
        let tracker = SessionTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = tracker.subscribe(move |state| {
            sink.lock().unwrap().push(state.session().map(|s| s.user_id.clone()));
        });

        tracker.publish(Some(session("a")));
        tracker.publish(None);
        tracker.publish(Some(session("b")));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("a".to_string()), None, Some("b".to_string())]
        );
        assert_eq!(tracker.current_session().unwrap().user_id, "b");
    }

    #[test]
    fn observer_may_drop_another_subscription() {
        let tracker = SessionTracker::new();
        let other_calls = Arc::new(AtomicUsize::new(0));
        let counter = other_calls.clone();
        let other = tracker.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let held = Arc::new(Mutex::new(Some(other)));
        let slot = held.clone();
        let _dropper = tracker.subscribe(move |_| {
            slot.lock().unwrap().take();
        });

        tracker.publish(Some(session("a")));
        tracker.publish(None);

        assert_eq!(other_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.observer_count(), 1);
    }

    #[test]
    fn late_subscriber_receives_current_state() {
        let tracker = SessionTracker::new();
        tracker.publish(None);

        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let _sub = tracker.subscribe(move |state| {
            assert_eq!(*state, SessionState::SignedOut);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_invocations_after_unsubscribe() {
        let tracker = SessionTracker::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let sub = tracker.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tracker.publish(Some(session("a")));
        sub.unsubscribe();
        tracker.publish(None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.observer_count(), 0);
    }

    #[tokio::test]
    async fn known_waits_for_first_report() {
        let tracker = SessionTracker::new();
        let waiter = tracker.clone();
        let pending = tokio::spawn(async move { waiter.known().await });

        tokio::task::yield_now().await;
        tracker.publish(Some(session("a")));

        let state = pending.await.unwrap();
        assert_eq!(state.session().unwrap().user_id, "a");
    }
}
