//! Instagram Graph API abstraction and implementations
//!
//! This module defines the remote operations the services depend on: the
//! OAuth token flows, the profile fetch, and the three-step publishing
//! sequence (create container, poll status, publish). The production
//! implementation lives in [`graph`]; [`mock`] provides a scriptable
//! stand-in for tests.
//!
//! Implementations are stateless wrappers over the wire protocol. They
//! perform no retries and no interpretation of remote errors beyond
//! surfacing the remote-supplied message; deciding what a failure means is
//! the caller's job.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::types::MediaKind;

pub mod graph;

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Result of exchanging a one-time authorization code: a short-lived token
/// (~1 hour) and the numeric id of the user who granted it.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeExchange {
    pub access_token: String,
    pub user_id: i64,
}

/// A long-lived token (~60 days) as returned by the upgrade and refresh
/// endpoints. `expires_in` is in seconds from now.
#[derive(Debug, Clone, Deserialize)]
pub struct LongLivedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Profile snapshot of the connected user.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// Instagram user id; the key accounts are stored under
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Processing state of a media container, as reported by the status
/// endpoint's `status_code` field.
///
/// Anything the platform adds later arrives as `Other` and is treated like
/// `InProgress` by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    Expired,
    Published,
    Other(String),
}

impl ContainerStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => Self::InProgress,
            "FINISHED" => Self::Finished,
            "ERROR" => Self::Error,
            "EXPIRED" => Self::Expired,
            "PUBLISHED" => Self::Published,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Expired => "EXPIRED",
            Self::Published => "PUBLISHED",
            Self::Other(s) => s,
        }
    }

    /// The container can be published. `PUBLISHED` counts: a container the
    /// platform already accepted is past processing.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Finished | Self::Published)
    }

    /// The container can never be published; polling further is pointless.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Expired)
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client for the Instagram Graph API operations Gramcast uses
///
/// All methods take the caller-supplied bearer token; implementations hold
/// no per-account state. Every method maps a non-success HTTP outcome or an
/// error-envelope payload to `ApiError` carrying the remote message.
#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// Exchange a one-time OAuth authorization code for a short-lived token
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the code is invalid, expired, or was issued
    /// for a different redirect URI.
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange>;

    /// Upgrade a short-lived token to a long-lived one (~60 days)
    async fn exchange_long_lived(&self, short_lived_token: &str) -> Result<LongLivedToken>;

    /// Refresh a long-lived token, extending its validity
    ///
    /// The token being refreshed must still be valid; an expired token
    /// cannot be refreshed and the account has to be reconnected.
    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken>;

    /// Fetch the profile of the user the token belongs to
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;

    /// Create a media container for later publishing
    ///
    /// Reels submit the source URL as a video with an explicit media-type
    /// marker; images submit it as an image with no marker. A missing
    /// caption is omitted from the request entirely.
    ///
    /// Returns the container id.
    async fn create_container(
        &self,
        owner_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<String>;

    /// Read the processing status of a container
    async fn container_status(
        &self,
        access_token: &str,
        container_id: &str,
    ) -> Result<ContainerStatus>;

    /// Publish a finished container. Returns the id of the live media.
    async fn publish_container(
        &self,
        owner_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<String>;

    /// Look up the permanent public URL of published media, when the
    /// platform already has one
    async fn fetch_permalink(&self, access_token: &str, media_id: &str) -> Result<Option<String>>;
}
