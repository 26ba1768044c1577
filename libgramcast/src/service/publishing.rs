//! Publishing service: drives a post through the container pipeline
//!
//! Instagram publishing is asynchronous on the remote side: a container is
//! created, the platform transcodes it, and only a finished container can
//! be published. This module owns that pipeline and the post's durable
//! state. Every transition is persisted before the next remote call, so
//! after a crash the stored post tells exactly how far processing got;
//! there is no automatic resumption, a failed post is resubmitted as a new
//! one.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::accounts::AccountService;
use crate::config::Config;
use crate::db::Database;
use crate::error::{ApiError, GramcastError, Result};
use crate::instagram::InstagramApi;
use crate::types::{Account, MediaKind, Post};

/// Reels transcode server-side far longer than images; they get this many
/// times the configured attempt budget
const REELS_ATTEMPT_MULTIPLIER: u32 = 3;

/// Publishing service
///
/// One `create_post` call runs one post's pipeline to completion or
/// failure. Polling suspends only the calling task, so any number of posts
/// can be in flight concurrently; they share no mutable state besides their
/// own rows.
#[derive(Clone)]
pub struct PublishingService {
    db: Arc<Database>,
    config: Arc<Config>,
    api: Arc<dyn InstagramApi>,
    accounts: AccountService,
}

/// Request to publish one piece of media
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub account_id: String,
    /// Publicly fetchable source URL of the media
    pub media_url: String,
    pub caption: Option<String>,
    /// Defaults to an image post when not given
    pub media_kind: Option<MediaKind>,
}

impl PublishingService {
    pub fn new(
        db: Arc<Database>,
        config: Arc<Config>,
        api: Arc<dyn InstagramApi>,
        accounts: AccountService,
    ) -> Self {
        Self {
            db,
            config,
            api,
            accounts,
        }
    }

    /// Publish media to Instagram, tracking the attempt as a post row
    ///
    /// Resolves the account (refreshing its token if near expiry), persists
    /// a pending post, then runs the container pipeline. On success the
    /// returned post is `published` and carries the remote media id, plus
    /// the permalink when the platform already has one.
    ///
    /// # Errors
    ///
    /// `InvalidInput` and `NotFound` are returned before any post row
    /// exists. Once the pipeline has started, every failure is recorded on
    /// the post and surfaced as a single `PublishFailed` carrying the post
    /// id and the stored message, so callers can look up the partial state.
    pub async fn create_post(&self, request: PostRequest) -> Result<Post> {
        let media_kind = request.media_kind.unwrap_or(MediaKind::Image);
        validate_media_url(&request.media_url)?;

        let account = self.accounts.get_active(&request.account_id).await?;
        let account = self.accounts.refresh_if_needed(&account).await?;

        let mut post = Post::new(
            account.id.clone(),
            media_kind,
            request.media_url.clone(),
            request.caption.clone(),
        );
        self.db.create_post(&post).await?;
        info!(
            "Accepted {} post {} for account {}",
            media_kind, post.id, account.id
        );

        if let Err(e) = self.run_pipeline(&mut post, &account).await {
            let message = failure_message(&e);
            warn!("Publishing post {} failed: {}", post.id, message);
            post.mark_failed(message.clone());
            if let Err(save_err) = self.db.update_post(&post).await {
                warn!(
                    "Could not record failure for post {}: {}",
                    post.id, save_err
                );
            }
            return Err(GramcastError::PublishFailed {
                post_id: post.id.clone(),
                message,
            });
        }

        self.attach_permalink(&mut post, &account).await;

        info!(
            "Published post {} as media {}",
            post.id,
            post.instagram_media_id.as_deref().unwrap_or("?")
        );
        Ok(post)
    }

    /// Read a single post
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no post has that id.
    pub async fn get_post(&self, post_id: &str) -> Result<Post> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| GramcastError::NotFound(format!("No post with id {}", post_id)))
    }

    /// All posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.db.list_posts().await
    }

    /// Container create, poll, publish, persisting after each step
    async fn run_pipeline(&self, post: &mut Post, account: &Account) -> Result<()> {
        let container_id = self
            .api
            .create_container(
                &account.instagram_user_id,
                &account.access_token,
                &post.media_url,
                post.media_kind,
                post.caption.as_deref(),
            )
            .await?;
        post.mark_container_created(container_id.clone());
        self.db.update_post(post).await?;
        debug!("Post {} got container {}", post.id, container_id);

        post.mark_processing();
        self.db.update_post(post).await?;

        self.poll_container(post, account, &container_id).await?;

        let media_id = self
            .api
            .publish_container(
                &account.instagram_user_id,
                &account.access_token,
                &container_id,
            )
            .await?;
        post.mark_published(media_id);
        self.db.update_post(post).await?;

        Ok(())
    }

    /// Poll the container at a fixed interval until it is ready
    ///
    /// Each status call consumes one attempt; a non-terminal status sleeps
    /// and tries again while attempts remain. A terminal failure status or
    /// an exhausted budget is an error; a thrown status call is not retried.
    async fn poll_container(
        &self,
        post: &mut Post,
        account: &Account,
        container_id: &str,
    ) -> Result<()> {
        let interval = Duration::from_millis(self.config.publish.poll_interval_ms);
        let max_attempts = effective_attempts(self.config.publish.poll_max_attempts, post.media_kind);

        for attempt in 1..=max_attempts {
            let status = self
                .api
                .container_status(&account.access_token, container_id)
                .await?;

            if status.is_ready() {
                debug!(
                    "Container {} ready after {} status check(s)",
                    container_id, attempt
                );
                post.mark_container_finished();
                self.db.update_post(post).await?;
                return Ok(());
            }
            if status.is_failure() {
                return Err(ApiError::remote(format!(
                    "Container {} reached status {} while processing",
                    container_id, status
                ))
                .into());
            }

            debug!(
                "Container {} still {} (attempt {}/{})",
                container_id, status, attempt, max_attempts
            );
            if attempt < max_attempts {
                sleep(interval).await;
            }
        }

        Err(ApiError::remote(format!(
            "Container {} not finished after {} status checks",
            container_id, max_attempts
        ))
        .into())
    }

    /// Best-effort permalink lookup for freshly published media
    ///
    /// The permalink is a convenience field; the post stays `published`
    /// whether or not this succeeds.
    async fn attach_permalink(&self, post: &mut Post, account: &Account) {
        let media_id = match &post.instagram_media_id {
            Some(id) => id.clone(),
            None => return,
        };

        match self.api.fetch_permalink(&account.access_token, &media_id).await {
            Ok(Some(permalink)) => {
                post.set_permalink(permalink);
                if let Err(e) = self.db.update_post(post).await {
                    warn!("Could not save permalink for post {}: {}", post.id, e);
                }
            }
            Ok(None) => debug!("No permalink available yet for post {}", post.id),
            Err(e) => warn!("Permalink lookup failed for post {}: {}", post.id, e),
        }
    }
}

/// Attempt budget for one post: reels get a fixed multiple of the base
fn effective_attempts(base: u32, kind: MediaKind) -> u32 {
    match kind {
        MediaKind::Image => base,
        MediaKind::Reels => base.saturating_mul(REELS_ATTEMPT_MULTIPLIER),
    }
}

/// The message stored on a failed post and carried by the publish error
///
/// Remote errors contribute the remote-supplied message verbatim; other
/// failures use their display form.
fn failure_message(error: &GramcastError) -> String {
    match error {
        GramcastError::Api(ApiError::Remote { message, .. }) => message.clone(),
        GramcastError::Api(api) => api.to_string(),
        other => other.to_string(),
    }
}

fn validate_media_url(media_url: &str) -> Result<()> {
    if media_url.trim().is_empty() {
        return Err(GramcastError::InvalidInput(
            "media URL must not be empty".to_string(),
        ));
    }
    let parsed = Url::parse(media_url)
        .map_err(|e| GramcastError::InvalidInput(format!("media URL is not valid: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GramcastError::InvalidInput(format!(
            "media URL must use http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
