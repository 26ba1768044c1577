//! Core types for Gramcast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authorized connection to Instagram.
///
/// Accounts are created on the first successful OAuth callback for a given
/// Instagram user id and updated in place on every reconnect or token
/// refresh. They are never physically deleted; disconnecting flips
/// `is_active` off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Instagram's user id; unique, immutable once set
    pub instagram_user_id: String,
    /// Handle shown to users; refreshed on every reconnect
    pub username: String,
    pub display_name: Option<String>,
    pub profile_picture_url: Option<String>,
    /// Long-lived bearer token
    pub access_token: String,
    /// Absolute token expiry (Unix timestamp)
    pub token_expires_at: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Account {
    pub fn new(
        instagram_user_id: String,
        username: String,
        access_token: String,
        token_expires_at: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            instagram_user_id,
            username,
            display_name: None,
            profile_picture_url: None,
            access_token,
            token_expires_at,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the token expires within the next `window_secs` seconds
    /// (or has already expired).
    pub fn token_expires_within(&self, window_secs: i64) -> bool {
        self.token_expires_at - chrono::Utc::now().timestamp() < window_secs
    }
}

/// Whether a post is a static image or a short-form video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Reels,
}

impl MediaKind {
    /// Parse from the lowercase wire/CLI form (e.g., "reels")
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image" => Some(Self::Image),
            "reels" => Some(Self::Reels),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Reels => "reels",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a post.
///
/// Transitions move forward only: pending, container_created, processing,
/// container_finished, published. `Failed` absorbs from any non-terminal
/// state. `Published` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    ContainerCreated,
    Processing,
    ContainerFinished,
    Published,
    Failed,
}

impl PostStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "container_created" => Some(Self::ContainerCreated),
            "processing" => Some(Self::Processing),
            "container_finished" => Some(Self::ContainerFinished),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ContainerCreated => "container_created",
            Self::Processing => "processing",
            Self::ContainerFinished => "container_finished",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of publishing work and its lifecycle.
///
/// The stored row is updated before every remote call, so after a crash it
/// reflects the last completed step. `account_id` is nullable so the post
/// survives removal of its account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub account_id: Option<String>,
    pub media_kind: MediaKind,
    pub media_url: String,
    pub caption: Option<String>,
    pub status: PostStatus,
    /// Remote staging container id; set once after container creation
    pub container_id: Option<String>,
    /// Remote media id; set once after publish
    pub instagram_media_id: Option<String>,
    /// Permanent public URL, when the platform reports one
    pub permalink: Option<String>,
    /// Set only when the post fails
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn new(
        account_id: String,
        media_kind: MediaKind,
        media_url: String,
        caption: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: Some(account_id),
            media_kind,
            media_url,
            caption,
            status: PostStatus::Pending,
            container_id: None,
            instagram_media_id: None,
            permalink: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_container_created(&mut self, container_id: String) {
        self.container_id = Some(container_id);
        self.status = PostStatus::ContainerCreated;
        self.touch();
    }

    pub fn mark_processing(&mut self) {
        self.status = PostStatus::Processing;
        self.touch();
    }

    pub fn mark_container_finished(&mut self) {
        self.status = PostStatus::ContainerFinished;
        self.touch();
    }

    pub fn mark_published(&mut self, instagram_media_id: String) {
        self.instagram_media_id = Some(instagram_media_id);
        self.status = PostStatus::Published;
        self.error_message = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, error_message: String) {
        self.status = PostStatus::Failed;
        self.error_message = Some(error_message);
        self.touch();
    }

    pub fn set_permalink(&mut self, permalink: String) {
        self.permalink = Some(permalink);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}
