//! crates/peerconnect_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};

/// Identifier assigned by the profile store once a profile is persisted.
pub type ProfileId = i64;

/// The authenticated identity as reported by the identity provider.
///
/// A snapshot: each provider notification replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    /// Two sessions belong to the same identity when their stable user ids match.
    pub fn same_identity(&self, other: &Session) -> bool {
        self.user_id == other.user_id
    }
}

/// A persisted profile, as returned by the profile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    pub headline: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub github_url: Option<String>,
    pub colab_url: Option<String>,
}

impl Profile {
    /// Case-insensitive match on the profile's email, the key correlating it with a `Session`.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

/// A profile that has not been persisted yet (no `id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub email: String,
    pub full_name: String,
    pub headline: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub github_url: Option<String>,
    pub colab_url: Option<String>,
}

/// A partial update of the mutable profile fields.
///
/// The outer `Option` means "leave unchanged"; for nullable fields the inner
/// `None` means "clear". `email` is deliberately absent: it is immutable once
/// a profile exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub headline: Option<Option<String>>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub colab_url: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == ProfilePatch::default()
    }
}

/// A candidate ranked against a reference profile. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub candidate: Profile,
    pub score: usize,
}
