//! services/client/src/app/flows.rs
//!
//! The page-level flows: sign-in and sign-out, routing, the dashboard, and the
//! single canonical path for saving a profile.

use std::time::Duration;

use peerconnect_core::domain::{MatchResult, Profile, ProfileId, Session};
use peerconnect_core::form::{Field, FieldError, ProfileDraft, ValidationError};
use peerconnect_core::matching;
use peerconnect_core::resolution::{select_route, Resolution, Route, View};
use peerconnect_core::session::SessionState;
use tracing::{error, info, warn};

use crate::app::state::AppState;
use crate::error::ClientError;

/// How long a flow waits for the tracker to reflect a provider call.
const SESSION_SYNC_TIMEOUT: Duration = Duration::from_secs(10);

//=========================================================================================
// View Models
//=========================================================================================

/// One candidate on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub result: MatchResult,
    pub shared_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// `None` until the user has onboarded; every score is then 0.
    pub me: Option<Profile>,
    pub matches: Vec<MatchEntry>,
}

/// What the editor submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Update(ProfileId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub mode: EditorMode,
    pub draft: ProfileDraft,
}

//=========================================================================================
// Session Flows
//=========================================================================================

/// Runs the provider's sign-in and waits until the tracker reports the new session.
pub async fn sign_in(state: &AppState) -> Result<Session, ClientError> {
    let session = state.identity.sign_in_interactive().await.map_err(|e| {
        error!("Sign-in failed: {}", e);
        ClientError::from(e)
    })?;

    wait_for_session(state, |current| {
        current
            .session()
            .is_some_and(|s| s.same_identity(&session))
    })
    .await?;
    Ok(session)
}

/// Signs out. On failure the session is left as it was.
pub async fn sign_out(state: &AppState) -> Result<(), ClientError> {
    if let Err(e) = state.identity.sign_out().await {
        warn!("Sign-out failed; staying signed in: {}", e);
        return Err(e.into());
    }
    wait_for_session(state, |current| *current == SessionState::SignedOut).await
}

async fn wait_for_session<F>(state: &AppState, reached: F) -> Result<(), ClientError>
where
    F: FnMut(&SessionState) -> bool,
{
    let mut rx = state.tracker.watch();
    let outcome = match tokio::time::timeout(SESSION_SYNC_TIMEOUT, rx.wait_for(reached)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(ClientError::Internal("Session tracker closed".to_string())),
        Err(_) => Err(ClientError::Internal(
            "Identity provider did not report the session change".to_string(),
        )),
    };
    outcome
}

//=========================================================================================
// Routing
//=========================================================================================

/// The route to show once the session is known and, if signed in, resolved.
pub async fn route(state: &AppState, requested: View) -> Route {
    let session_state = state.tracker.known().await;
    let resolution = match session_state.session() {
        Some(session) => state.resolution.settled_for(session).await,
        None => Resolution::NotChecked,
    };
    select_route(&session_state, &resolution, requested)
}

/// Re-runs a failed lookup.
pub async fn retry(state: &AppState) -> Resolution {
    info!("Retrying profile lookup.");
    state.resolution.retry().await
}

/// The signed-in session as the tracker reports it.
fn signed_in(state: &AppState) -> Result<Session, ClientError> {
    state.tracker.current_session().ok_or(ClientError::NotSignedIn)
}

/// Re-reads the profile of `session`; the tri-state answer is turned into a
/// result. Fails with `NotSignedIn` once `session` is no longer the one
/// being followed.
async fn refreshed_profile(
    state: &AppState,
    session: &Session,
) -> Result<Option<Profile>, ClientError> {
    match state.resolution.refresh_for(session).await {
        Resolution::Checked(profile) => Ok(profile),
        Resolution::Failed(e) => Err(e.into()),
        Resolution::NotChecked => Err(ClientError::NotSignedIn),
    }
}

//=========================================================================================
// Dashboard
//=========================================================================================

/// Loads my profile and every other profile ranked by skill overlap with mine.
pub async fn load_dashboard(state: &AppState) -> Result<Dashboard, ClientError> {
    let session = signed_in(state)?;
    let me = refreshed_profile(state, &session).await?;
    let all = state.store.list().await?;

    let candidates = matching::others(me.as_ref(), all);
    let matches = matching::rank(me.as_ref(), candidates)
        .into_iter()
        .map(|result| MatchEntry {
            shared_skills: me
                .as_ref()
                .map(|m| matching::shared_skills(m, &result.candidate))
                .unwrap_or_default(),
            result,
        })
        .collect::<Vec<_>>();

    info!(candidates = matches.len(), has_profile = me.is_some(), "Dashboard loaded.");
    Ok(Dashboard { me, matches })
}

//=========================================================================================
// Profile Editing
//=========================================================================================

/// Prepares the editor: prefilled from my profile, or seeded with my email.
pub async fn load_editor(state: &AppState) -> Result<Editor, ClientError> {
    let session = signed_in(state)?;
    let editor = match refreshed_profile(state, &session).await? {
        Some(profile) => Editor {
            mode: EditorMode::Update(profile.id),
            draft: ProfileDraft::from_profile(&profile),
        },
        None => Editor {
            mode: EditorMode::Create,
            draft: ProfileDraft::for_session(&session),
        },
    };
    Ok(editor)
}

/// Saves the draft: creates my profile if I have none, updates it otherwise.
///
/// An invalid draft is rejected before any request is made. After a
/// successful save the resolution is refreshed so routing follows.
pub async fn save_profile(state: &AppState, draft: &ProfileDraft) -> Result<Profile, ClientError> {
    draft.validate()?;
    let session = signed_in(state)?;

    let saved = match refreshed_profile(state, &session).await? {
        Some(existing) => {
            let patch = draft.to_patch()?;
            info!(profile_id = existing.id, "Updating existing profile.");
            state.store.update(existing.id, &patch).await?
        }
        None => {
            if !session.email.eq_ignore_ascii_case(draft.email.trim()) {
                return Err(ValidationError {
                    errors: vec![FieldError {
                        field: Field::Email,
                        message: "Email must match the signed-in account".to_string(),
                    }],
                }
                .into());
            }
            let new_profile = draft.to_new_profile()?;
            info!(email = %new_profile.email, "Creating profile.");
            state.store.create(&new_profile).await?
        }
    };

    state.resolution.refresh_for(&session).await;
    Ok(saved)
}

/// Deletes my profile. Routing falls back to profile creation afterwards.
pub async fn delete_profile(state: &AppState) -> Result<(), ClientError> {
    let session = signed_in(state)?;
    let profile = refreshed_profile(state, &session)
        .await?
        .ok_or_else(|| ClientError::Internal("There is no profile to delete".to_string()))?;

    state.store.delete(profile.id).await?;
    info!(profile_id = profile.id, "Profile deleted.");
    state.resolution.refresh_for(&session).await;
    Ok(())
}
