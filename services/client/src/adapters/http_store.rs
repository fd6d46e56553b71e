//! services/client/src/adapters/http_store.rs
//!
//! This module contains the profile store adapter, the concrete implementation
//! of the `ProfileStore` port from the `core` crate. It talks to the remote
//! `/users/` REST API using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use peerconnect_core::domain::{NewProfile, Profile, ProfileId, ProfilePatch};
use peerconnect_core::ports::{PortError, PortResult, ProfileStore};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("peerconnect/", env!("CARGO_PKG_VERSION"));

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A profile store adapter that implements the `ProfileStore` port over HTTP.
///
/// One call is one request. Failures are returned as they are; retrying is
/// the caller's decision.
#[derive(Clone)]
pub struct HttpProfileStore {
    http: reqwest::Client,
    base: String,
}

impl HttpProfileStore {
    /// Creates a new `HttpProfileStore` for the store at `base` (an origin such
    /// as `http://127.0.0.1:8000`).
    pub fn new(base: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Sends a request and turns non-success statuses into `PortError::Remote`.
    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.text().await {
            Ok(body) => error_message(&body),
            Err(e) => unreadable_body(status, &e),
        };
        warn!(status = status.as_u16(), message = %message, "Profile store returned an error.");
        Err(PortError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> PortResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Decode(e.to_string()))
    }
}

/// The store's error bodies are either `{"detail": "..."}` or plain text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.detail,
        Err(_) => body.trim().to_string(),
    }
}

fn unreadable_body(status: StatusCode, error: &reqwest::Error) -> String {
    format!(
        "{} (error body unreadable: {})",
        status.canonical_reason().unwrap_or("Unknown status"),
        error
    )
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Deserialize)]
struct ProfileRecord {
    id: ProfileId,
    full_name: String,
    email: String,
    headline: Option<String>,
    #[serde(default)]
    skills: Option<Vec<String>>,
    #[serde(default)]
    interests: Option<Vec<String>>,
    github_url: Option<String>,
    colab_url: Option<String>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            headline: self.headline,
            skills: self.skills.unwrap_or_default(),
            interests: self.interests.unwrap_or_default(),
            github_url: self.github_url,
            colab_url: self.colab_url,
        }
    }
}

#[derive(Serialize)]
struct CreateBody<'a> {
    full_name: &'a str,
    email: &'a str,
    headline: Option<&'a str>,
    skills: &'a [String],
    interests: &'a [String],
    github_url: Option<&'a str>,
    colab_url: Option<&'a str>,
}
impl<'a> CreateBody<'a> {
    fn from_domain(profile: &'a NewProfile) -> Self {
        Self {
            full_name: &profile.full_name,
            email: &profile.email,
            headline: profile.headline.as_deref(),
            skills: &profile.skills,
            interests: &profile.interests,
            github_url: profile.github_url.as_deref(),
            colab_url: profile.colab_url.as_deref(),
        }
    }
}

/// Only fields present in the patch are sent; a cleared field is sent as `null`.
#[derive(Serialize)]
struct PatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headline: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skills: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interests: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    github_url: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    colab_url: Option<Option<&'a str>>,
}
impl<'a> PatchBody<'a> {
    fn from_domain(patch: &'a ProfilePatch) -> Self {
        Self {
            full_name: patch.full_name.as_deref(),
            headline: patch.headline.as_ref().map(Option::as_deref),
            skills: patch.skills.as_deref(),
            interests: patch.interests.as_deref(),
            github_url: patch.github_url.as_ref().map(Option::as_deref),
            colab_url: patch.colab_url.as_ref().map(Option::as_deref),
        }
    }
}

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn create(&self, profile: &NewProfile) -> PortResult<Profile> {
        debug!(email = %profile.email, "Creating profile.");
        let request = self
            .http
            .post(self.url("/users/"))
            .json(&CreateBody::from_domain(profile));
        let record: ProfileRecord = Self::parse(self.send(request).await?).await?;
        Ok(record.to_domain())
    }

    async fn list(&self) -> PortResult<Vec<Profile>> {
        debug!("Listing profiles.");
        let request = self.http.get(self.url("/users/"));
        let records: Vec<ProfileRecord> = Self::parse(self.send(request).await?).await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_by_id(&self, id: ProfileId) -> PortResult<Profile> {
        debug!(profile_id = id, "Fetching profile.");
        let request = self.http.get(self.url(&format!("/users/{}", id)));
        let record: ProfileRecord = Self::parse(self.send(request).await?).await?;
        Ok(record.to_domain())
    }

    async fn update(&self, id: ProfileId, patch: &ProfilePatch) -> PortResult<Profile> {
        debug!(profile_id = id, "Updating profile.");
        let request = self
            .http
            .patch(self.url(&format!("/users/{}", id)))
            .json(&PatchBody::from_domain(patch));
        let record: ProfileRecord = Self::parse(self.send(request).await?).await?;
        Ok(record.to_domain())
    }

    async fn delete(&self, id: ProfileId) -> PortResult<()> {
        debug!(profile_id = id, "Deleting profile.");
        let request = self.http.delete(self.url(&format!("/users/{}", id)));
        let response = self.send(request).await?;
        // 204 carries no body; any other success body is ignored.
        if response.status() != StatusCode::NO_CONTENT {
            debug!(status = response.status().as_u16(), "Delete returned a body; ignoring it.");
        }
        Ok(())
    }
}
