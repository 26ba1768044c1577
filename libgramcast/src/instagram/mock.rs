//! Mock Instagram client for testing
//!
//! Deterministic stand-in for [`GraphClient`](super::graph::GraphClient):
//! tokens are derived from their inputs (`short-{code}`, `long-{short}`,
//! `refreshed-{old}`), container and media ids are numbered in creation
//! order, and container statuses come from a configurable script. Every
//! call is counted and argument-recording accessors let tests assert on
//! exactly what the services sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ApiError, Result};
use crate::types::MediaKind;

use super::{CodeExchange, ContainerStatus, InstagramApi, LongLivedToken, Profile};

/// Configuration for mock behavior
#[derive(Debug, Clone)]
pub struct MockInstagramConfig {
    /// Numeric user id returned by the code exchange
    pub user_id: i64,
    /// Profile returned by `fetch_profile` (changeable later via `set_profile`)
    pub profile: Profile,
    /// Lifetime in seconds reported for long-lived and refreshed tokens
    pub expires_in: i64,
    /// Statuses returned by `container_status`, one per call, in order
    pub statuses: Vec<ContainerStatus>,
    /// Status returned once the script is exhausted
    pub fallback_status: ContainerStatus,
    /// Permalink returned for published media
    pub permalink: Option<String>,
    /// Error message for `exchange_code`, if it should fail
    pub exchange_error: Option<String>,
    /// Error message for `exchange_long_lived`, if it should fail
    pub long_lived_error: Option<String>,
    /// Error message for `refresh_token`, if it should fail
    pub refresh_error: Option<String>,
    /// Error message for `fetch_profile`, if it should fail
    pub profile_error: Option<String>,
    /// Error message for `create_container`, if it should fail
    pub create_error: Option<String>,
    /// Error message for `container_status`, if it should fail
    pub status_error: Option<String>,
    /// Error message for `publish_container`, if it should fail
    pub publish_error: Option<String>,
    /// Error message for `fetch_permalink`, if it should fail
    pub permalink_error: Option<String>,
}

impl Default for MockInstagramConfig {
    fn default() -> Self {
        Self {
            user_id: 17841400000000001,
            profile: Profile {
                id: "17841400000000001".to_string(),
                username: "mockuser".to_string(),
                name: Some("Mock User".to_string()),
                profile_picture_url: Some("https://cdn.example.com/mockuser.jpg".to_string()),
            },
            expires_in: 5_184_000,
            statuses: Vec::new(),
            fallback_status: ContainerStatus::Finished,
            permalink: Some("https://www.instagram.com/p/MOCK1/".to_string()),
            exchange_error: None,
            long_lived_error: None,
            refresh_error: None,
            profile_error: None,
            create_error: None,
            status_error: None,
            publish_error: None,
            permalink_error: None,
        }
    }
}

/// Number of calls made to each mock method
#[derive(Debug, Default, Clone)]
pub struct CallCounts {
    pub exchange_code: usize,
    pub exchange_long_lived: usize,
    pub refresh_token: usize,
    pub fetch_profile: usize,
    pub create_container: usize,
    pub container_status: usize,
    pub publish_container: usize,
    pub fetch_permalink: usize,
}

/// Arguments of one `create_container` call
#[derive(Debug, Clone)]
pub struct ContainerRequest {
    pub owner_id: String,
    pub access_token: String,
    pub media_url: String,
    pub media_kind: MediaKind,
    pub caption: Option<String>,
}

pub struct MockInstagram {
    config: MockInstagramConfig,
    profile: Arc<Mutex<Profile>>,
    status_script: Arc<Mutex<VecDeque<ContainerStatus>>>,
    counts: Arc<Mutex<CallCounts>>,
    container_requests: Arc<Mutex<Vec<ContainerRequest>>>,
    published_ids: Arc<Mutex<Vec<String>>>,
    refreshed_tokens: Arc<Mutex<Vec<String>>>,
    next_container: Arc<Mutex<usize>>,
    next_media: Arc<Mutex<usize>>,
}

impl MockInstagram {
    pub fn new(config: MockInstagramConfig) -> Self {
        let profile = config.profile.clone();
        let script: VecDeque<ContainerStatus> = config.statuses.iter().cloned().collect();
        Self {
            config,
            profile: Arc::new(Mutex::new(profile)),
            status_script: Arc::new(Mutex::new(script)),
            counts: Arc::new(Mutex::new(CallCounts::default())),
            container_requests: Arc::new(Mutex::new(Vec::new())),
            published_ids: Arc::new(Mutex::new(Vec::new())),
            refreshed_tokens: Arc::new(Mutex::new(Vec::new())),
            next_container: Arc::new(Mutex::new(0)),
            next_media: Arc::new(Mutex::new(0)),
        }
    }

    /// Mock where every call succeeds and containers finish immediately
    pub fn success() -> Self {
        Self::new(MockInstagramConfig::default())
    }

    /// Mock whose status endpoint plays `statuses` in order, then repeats
    /// `fallback` forever
    pub fn with_statuses(statuses: Vec<ContainerStatus>, fallback: ContainerStatus) -> Self {
        Self::new(MockInstagramConfig {
            statuses,
            fallback_status: fallback,
            ..Default::default()
        })
    }

    /// Mock where the code exchange fails
    pub fn exchange_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            exchange_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Mock where the short-to-long token upgrade fails
    pub fn long_lived_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            long_lived_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Mock where container creation fails
    pub fn create_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            create_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Mock where the status poll fails
    pub fn status_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            status_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Mock where publishing fails
    pub fn publish_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            publish_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Mock where only the permalink lookup fails
    pub fn permalink_failure(message: &str) -> Self {
        Self::new(MockInstagramConfig {
            permalink_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Replace the profile returned by subsequent `fetch_profile` calls
    pub fn set_profile(&self, profile: Profile) {
        *self.profile.lock().unwrap() = profile;
    }

    pub fn counts(&self) -> CallCounts {
        self.counts.lock().unwrap().clone()
    }

    /// Arguments of every `create_container` call, in order
    pub fn container_requests(&self) -> Vec<ContainerRequest> {
        self.container_requests.lock().unwrap().clone()
    }

    /// Creation ids passed to `publish_container`, in order
    pub fn published_ids(&self) -> Vec<String> {
        self.published_ids.lock().unwrap().clone()
    }

    /// Tokens passed to `refresh_token`, in order
    pub fn refreshed_tokens(&self) -> Vec<String> {
        self.refreshed_tokens.lock().unwrap().clone()
    }

    fn fail_if(message: &Option<String>) -> Result<()> {
        if let Some(message) = message {
            return Err(ApiError::remote(message.clone()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl InstagramApi for MockInstagram {
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange> {
        self.counts.lock().unwrap().exchange_code += 1;
        Self::fail_if(&self.config.exchange_error)?;
        Ok(CodeExchange {
            access_token: format!("short-{}", code),
            user_id: self.config.user_id,
        })
    }

    async fn exchange_long_lived(&self, short_lived_token: &str) -> Result<LongLivedToken> {
        self.counts.lock().unwrap().exchange_long_lived += 1;
        Self::fail_if(&self.config.long_lived_error)?;
        Ok(LongLivedToken {
            access_token: format!("long-{}", short_lived_token),
            expires_in: self.config.expires_in,
        })
    }

    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken> {
        self.counts.lock().unwrap().refresh_token += 1;
        self.refreshed_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Self::fail_if(&self.config.refresh_error)?;
        Ok(LongLivedToken {
            access_token: format!("refreshed-{}", access_token),
            expires_in: self.config.expires_in,
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Profile> {
        self.counts.lock().unwrap().fetch_profile += 1;
        Self::fail_if(&self.config.profile_error)?;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn create_container(
        &self,
        owner_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<String> {
        self.counts.lock().unwrap().create_container += 1;
        self.container_requests
            .lock()
            .unwrap()
            .push(ContainerRequest {
                owner_id: owner_id.to_string(),
                access_token: access_token.to_string(),
                media_url: media_url.to_string(),
                media_kind,
                caption: caption.map(|c| c.to_string()),
            });
        Self::fail_if(&self.config.create_error)?;

        let mut next = self.next_container.lock().unwrap();
        *next += 1;
        Ok(format!("container-{}", *next))
    }

    async fn container_status(
        &self,
        _access_token: &str,
        _container_id: &str,
    ) -> Result<ContainerStatus> {
        self.counts.lock().unwrap().container_status += 1;
        Self::fail_if(&self.config.status_error)?;
        let scripted = self.status_script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| self.config.fallback_status.clone()))
    }

    async fn publish_container(
        &self,
        _owner_id: &str,
        _access_token: &str,
        container_id: &str,
    ) -> Result<String> {
        self.counts.lock().unwrap().publish_container += 1;
        self.published_ids
            .lock()
            .unwrap()
            .push(container_id.to_string());
        Self::fail_if(&self.config.publish_error)?;

        let mut next = self.next_media.lock().unwrap();
        *next += 1;
        Ok(format!("media-{}", *next))
    }

    async fn fetch_permalink(&self, _access_token: &str, _media_id: &str) -> Result<Option<String>> {
        self.counts.lock().unwrap().fetch_permalink += 1;
        Self::fail_if(&self.config.permalink_error)?;
        Ok(self.config.permalink.clone())
    }
}
