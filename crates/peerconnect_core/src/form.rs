//! crates/peerconnect_core/src/form.rs
//!
//! Converts between profiles and the flat text fields of the profile editor,
//! and validates a draft before anything is sent to the store.

use std::fmt;

use url::Url;

use crate::domain::{NewProfile, Profile, ProfilePatch, Session};

const FULL_NAME_MAX_CHARS: usize = 120;

//=========================================================================================
// List <-> Text
//=========================================================================================

/// Renders a list field for a single text input: `["a", "b"]` becomes `"a, b"`.
pub fn to_editable_text(items: &[String]) -> String {
    items.join(", ")
}

/// Parses a comma-separated text input back into a list.
///
/// Elements are trimmed and blanks dropped; order and duplicates are kept.
pub fn from_editable_text(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

//=========================================================================================
// Validation Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FullName,
    Email,
    GithubUrl,
    ColabUrl,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::FullName => "full_name",
            Field::Email => "email",
            Field::GithubUrl => "github_url",
            Field::ColabUrl => "colab_url",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// A rejected draft. Holds one message per offending field so the editor can
/// render each next to its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid profile: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn for_field(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

//=========================================================================================
// The Draft
//=========================================================================================

/// The editor's view of a profile: every field is plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub full_name: String,
    pub email: String,
    pub headline: String,
    pub skills: String,
    pub interests: String,
    pub github_url: String,
    pub colab_url: String,
}

impl ProfileDraft {
    /// An empty draft for a first-time user, seeded with the signed-in email.
    pub fn for_session(session: &Session) -> Self {
        Self {
            email: session.email.clone(),
            full_name: session.display_name.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Prefills the editor from an existing profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            headline: profile.headline.clone().unwrap_or_default(),
            skills: to_editable_text(&profile.skills),
            interests: to_editable_text(&profile.interests),
            github_url: profile.github_url.clone().unwrap_or_default(),
            colab_url: profile.colab_url.clone().unwrap_or_default(),
        }
    }

    /// Checks the draft without touching the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.push(FieldError {
                field: Field::FullName,
                message: "Full name is required".to_string(),
            });
        } else if full_name.chars().count() > FULL_NAME_MAX_CHARS {
            errors.push(FieldError {
                field: Field::FullName,
                message: format!("Full name must be at most {FULL_NAME_MAX_CHARS} characters"),
            });
        }

        if self.email.trim().is_empty() {
            errors.push(FieldError {
                field: Field::Email,
                message: "Email is required".to_string(),
            });
        }

        for (field, value) in [
            (Field::GithubUrl, &self.github_url),
            (Field::ColabUrl, &self.colab_url),
        ] {
            if let Some(message) = check_url(value) {
                errors.push(FieldError { field, message });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }

    /// Builds the create payload. Fails without side effects if the draft is invalid.
    pub fn to_new_profile(&self) -> Result<NewProfile, ValidationError> {
        self.validate()?;
        Ok(NewProfile {
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            headline: blank_to_none(&self.headline),
            skills: from_editable_text(&self.skills),
            interests: from_editable_text(&self.interests),
            github_url: blank_to_none(&self.github_url),
            colab_url: blank_to_none(&self.colab_url),
        })
    }

    /// Builds the update payload for an existing profile.
    ///
    /// Every mutable field is sent; blank optional fields are sent as cleared
    /// rather than as empty strings. The email is never part of an update.
    pub fn to_patch(&self) -> Result<ProfilePatch, ValidationError> {
        self.validate()?;
        Ok(ProfilePatch {
            full_name: Some(self.full_name.trim().to_string()),
            headline: Some(blank_to_none(&self.headline)),
            skills: Some(from_editable_text(&self.skills)),
            interests: Some(from_editable_text(&self.interests)),
            github_url: Some(blank_to_none(&self.github_url)),
            colab_url: Some(blank_to_none(&self.colab_url)),
        })
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn check_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => None,
        Ok(url) => Some(format!("Unsupported URL scheme '{}'", url.scheme())),
        Err(e) => Some(format!("Not a valid URL: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProfileDraft {
        ProfileDraft {
            full_name: "Alice Data".to_string(),
            email: "alice@example.com".to_string(),
            headline: "NLP enthusiast".to_string(),
            skills: "python, pandas , nlp".to_string(),
            interests: "recsys,vector-search".to_string(),
            github_url: "https://github.com/example/alice".to_string(),
            colab_url: String::new(),
        }
    }

    #[test]
    fn editable_text_joins_with_comma_space() {
        let items = vec!["sql".to_string(), "python".to_string()];
        assert_eq!(to_editable_text(&items), "sql, python");
        assert_eq!(to_editable_text(&[]), "");
    }

    #[test]
    fn parsing_trims_drops_blanks_and_keeps_duplicates() {
        assert_eq!(
            from_editable_text(" sql,, python ,sql, "),
            vec!["sql", "python", "sql"]
        );
        assert!(from_editable_text("").is_empty());
        assert!(from_editable_text(" , ,").is_empty());
    }

    #[test]
    fn text_survives_a_round_trip_without_commas() {
        let skills = vec!["machine learning".to_string(), "SQL".to_string(), "viz".to_string()];
        assert_eq!(from_editable_text(&to_editable_text(&skills)), skills);
    }

    #[test]
    fn blank_full_name_is_rejected() {
        let mut d = draft();
        d.full_name = "   ".to_string();
        let err = d.validate().unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.for_field(Field::FullName), Some("Full name is required"));
    }

    #[test]
    fn missing_email_and_bad_url_are_reported_together() {
        let mut d = draft();
        d.email = String::new();
        d.colab_url = "ftp://files.example.com".to_string();
        let err = d.validate().unwrap_err();
        assert!(err.for_field(Field::Email).is_some());
        assert!(err.for_field(Field::ColabUrl).is_some());
        assert!(err.for_field(Field::FullName).is_none());
    }

    #[test]
    fn overlong_full_name_is_rejected() {
        let mut d = draft();
        d.full_name = "x".repeat(121);
        assert!(d.validate().unwrap_err().for_field(Field::FullName).is_some());
    }

    #[test]
    fn new_profile_nulls_blank_optionals() {
        let mut d = draft();
        d.headline = "  ".to_string();
        let p = d.to_new_profile().unwrap();
        assert_eq!(p.headline, None);
        assert_eq!(p.colab_url, None);
        assert_eq!(p.skills, vec!["python", "pandas", "nlp"]);
        assert_eq!(p.github_url.as_deref(), Some("https://github.com/example/alice"));
    }

    #[test]
    fn patch_clears_blank_url_instead_of_sending_empty_string() {
        let mut d = draft();
        d.github_url = String::new();
        let patch = d.to_patch().unwrap();
        assert_eq!(patch.github_url, Some(None));
        assert_eq!(patch.full_name.as_deref(), Some("Alice Data"));
    }

    #[test]
    fn invalid_draft_produces_no_payload() {
        let d = ProfileDraft {
            email: "a@x.com".to_string(),
            ..Default::default()
        };
        assert!(d.to_new_profile().is_err());
        assert!(d.to_patch().is_err());
    }

    #[test]
    fn draft_prefills_from_profile() {
        let profile = Profile {
            id: 7,
            email: "b@x.com".to_string(),
            full_name: "Bob".to_string(),
            headline: None,
            skills: vec!["python".to_string(), "viz".to_string()],
            interests: Vec::new(),
            github_url: None,
            colab_url: Some("https://colab.research.google.com/x".to_string()),
        };
        let d = ProfileDraft::from_profile(&profile);
        assert_eq!(d.skills, "python, viz");
        assert_eq!(d.interests, "");
        assert_eq!(d.headline, "");
        assert_eq!(d.colab_url, "https://colab.research.google.com/x");
    }
}
