//! Integration tests for the publishing pipeline
//!
//! Drives GramcastService end to end against the mock Instagram client:
//! container creation, status polling, publish, and the failure paths that
//! must leave an accurate post row behind.

use std::sync::Arc;

use libgramcast::config::{DatabaseConfig, InstagramConfig, PublishConfig};
use libgramcast::instagram::mock::{MockInstagram, MockInstagramConfig};
use libgramcast::instagram::ContainerStatus;
use libgramcast::service::{GramcastService, PostRequest};
use libgramcast::{Config, GramcastError, MediaKind, PostStatus};
use tempfile::TempDir;

/// Setup test service with temporary database and the given mock
async fn setup_service(
    mock: MockInstagram,
    poll_max_attempts: u32,
) -> (GramcastService, Arc<MockInstagram>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config = Config {
        instagram: InstagramConfig {
            app_id: "12345".to_string(),
            app_secret: "shhh".to_string(),
            redirect_uri: "https://example.com/auth/callback".to_string(),
            api_version: "v23.0".to_string(),
            graph_base_url: "https://graph.instagram.com".to_string(),
            api_base_url: "https://api.instagram.com".to_string(),
            auth_base_url: "https://www.instagram.com".to_string(),
        },
        database: DatabaseConfig {
            path: db_path.to_str().unwrap().to_string(),
        },
        publish: PublishConfig {
            poll_interval_ms: 1,
            poll_max_attempts,
        },
    };

    let api = Arc::new(mock);
    let service = GramcastService::with_api(config, api.clone()).await.unwrap();
    (service, api, temp_dir)
}

fn request(account_id: &str, media_url: &str, caption: Option<&str>, kind: MediaKind) -> PostRequest {
    PostRequest {
        account_id: account_id.to_string(),
        media_url: media_url.to_string(),
        caption: caption.map(|c| c.to_string()),
        media_kind: Some(kind),
    }
}

#[tokio::test]
async fn test_image_post_happy_path() {
    let mock = MockInstagram::with_statuses(
        vec![ContainerStatus::InProgress, ContainerStatus::Finished],
        ContainerStatus::Finished,
    );
    let (service, api, _tmp) = setup_service(mock, 5).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let post = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            Some("Golden hour"),
            MediaKind::Image,
        ))
        .await
        .unwrap();

    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.container_id.as_deref(), Some("container-1"));
    assert_eq!(post.instagram_media_id.as_deref(), Some("media-1"));
    assert_eq!(
        post.permalink.as_deref(),
        Some("https://www.instagram.com/p/MOCK1/")
    );
    assert_eq!(post.error_message, None);

    // Two status checks: IN_PROGRESS then FINISHED
    let counts = api.counts();
    assert_eq!(counts.create_container, 1);
    assert_eq!(counts.container_status, 2);
    assert_eq!(counts.publish_container, 1);
    assert_eq!(counts.fetch_permalink, 1);
    assert_eq!(api.published_ids(), vec!["container-1"]);

    // The container request carried the caption and the image URL
    let requests = api.container_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].owner_id, account.instagram_user_id);
    assert_eq!(requests[0].media_url, "https://cdn.example.com/sunset.jpg");
    assert_eq!(requests[0].media_kind, MediaKind::Image);
    assert_eq!(requests[0].caption.as_deref(), Some("Golden hour"));

    // The stored row matches what was returned
    let stored = service.publishing().get_post(&post.id).await.unwrap();
    assert_eq!(stored.status, PostStatus::Published);
    assert_eq!(stored.instagram_media_id, post.instagram_media_id);
    assert_eq!(stored.permalink, post.permalink);
}

#[tokio::test]
async fn test_missing_caption_is_omitted_from_container_request() {
    let mock = MockInstagram::success();
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/plain.jpg",
            None,
            MediaKind::Image,
        ))
        .await
        .unwrap();

    assert_eq!(api.container_requests()[0].caption, None);
}

#[tokio::test]
async fn test_poll_budget_exhaustion_marks_post_failed() {
    let mock = MockInstagram::with_statuses(Vec::new(), ContainerStatus::InProgress);
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/slow.jpg",
            None,
            MediaKind::Image,
        ))
        .await;

    let (post_id, message) = match result {
        Err(GramcastError::PublishFailed { post_id, message }) => (post_id, message),
        other => panic!("Expected publish-failed error, got {:?}", other),
    };
    assert!(message.contains("container-1"), "message: {}", message);
    assert!(message.contains('3'), "message: {}", message);

    // Exactly the budget was spent; nothing was published
    let counts = api.counts();
    assert_eq!(counts.container_status, 3);
    assert_eq!(counts.publish_container, 0);

    // The stored post carries the same message and the container id
    let stored = service.publishing().get_post(&post_id).await.unwrap();
    assert_eq!(stored.status, PostStatus::Failed);
    assert_eq!(stored.container_id.as_deref(), Some("container-1"));
    assert_eq!(stored.error_message.as_deref(), Some(message.as_str()));
    assert_eq!(stored.instagram_media_id, None);
}

#[tokio::test]
async fn test_error_status_stops_polling_immediately() {
    let mock = MockInstagram::with_statuses(
        vec![ContainerStatus::InProgress, ContainerStatus::Error],
        ContainerStatus::InProgress,
    );
    let (service, api, _tmp) = setup_service(mock, 5).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/broken.jpg",
            None,
            MediaKind::Image,
        ))
        .await;

    let message = match result {
        Err(GramcastError::PublishFailed { message, .. }) => message,
        other => panic!("Expected publish-failed error, got {:?}", other),
    };
    assert!(message.contains("ERROR"), "message: {}", message);

    // ERROR on attempt 2 of 5: no third attempt happens
    assert_eq!(api.counts().container_status, 2);
    assert_eq!(api.counts().publish_container, 0);
}

#[tokio::test]
async fn test_reels_get_triple_attempt_budget() {
    let mock = MockInstagram::with_statuses(Vec::new(), ContainerStatus::InProgress);
    let (service, api, _tmp) = setup_service(mock, 2).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/clip.mp4",
            None,
            MediaKind::Reels,
        ))
        .await;

    let message = match result {
        Err(GramcastError::PublishFailed { message, .. }) => message,
        other => panic!("Expected publish-failed error, got {:?}", other),
    };

    // Base budget 2, tripled for reels
    assert_eq!(api.counts().container_status, 6);
    assert!(message.contains('6'), "message: {}", message);
    assert_eq!(api.container_requests()[0].media_kind, MediaKind::Reels);
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_before_container_create() {
    let mock = MockInstagram::success();
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let mut account = service.accounts().connect("code1").await.unwrap();

    // Age the stored token to three days before expiry
    account.token_expires_at = chrono::Utc::now().timestamp() + 3 * 24 * 3600;
    service.database().update_account(&account).await.unwrap();

    service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await
        .unwrap();

    // The refresh happened, against the old token
    assert_eq!(api.counts().refresh_token, 1);
    assert_eq!(api.refreshed_tokens(), vec!["long-short-code1"]);

    // The container was created with the refreshed token, not the stale one
    assert_eq!(
        api.container_requests()[0].access_token,
        "refreshed-long-short-code1"
    );

    // The replacement is durable
    let stored = service.accounts().get_active(&account.id).await.unwrap();
    assert_eq!(stored.access_token, "refreshed-long-short-code1");
}

#[tokio::test]
async fn test_fresh_token_is_not_refreshed() {
    let mock = MockInstagram::success();
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await
        .unwrap();

    assert_eq!(api.counts().refresh_token, 0);
    assert_eq!(api.container_requests()[0].access_token, "long-short-code1");
}

#[tokio::test]
async fn test_container_create_failure_stores_remote_message() {
    let mock = MockInstagram::create_failure("The image URL is invalid");
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/bad.jpg",
            None,
            MediaKind::Image,
        ))
        .await;

    let (post_id, message) = match result {
        Err(GramcastError::PublishFailed { post_id, message }) => (post_id, message),
        other => panic!("Expected publish-failed error, got {:?}", other),
    };
    // The remote message is stored verbatim, without error-type prefixes
    assert_eq!(message, "The image URL is invalid");

    let stored = service.publishing().get_post(&post_id).await.unwrap();
    assert_eq!(stored.status, PostStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("The image URL is invalid"));
    assert_eq!(stored.container_id, None);

    let counts = api.counts();
    assert_eq!(counts.container_status, 0);
    assert_eq!(counts.publish_container, 0);
}

#[tokio::test]
async fn test_publish_failure_keeps_container_id() {
    let mock = MockInstagram::publish_failure("Media cannot be published");
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await;

    let post_id = match result {
        Err(GramcastError::PublishFailed { post_id, message }) => {
            assert_eq!(message, "Media cannot be published");
            post_id
        }
        other => panic!("Expected publish-failed error, got {:?}", other),
    };

    // The pipeline got as far as a finished container; the row reflects that
    let stored = service.publishing().get_post(&post_id).await.unwrap();
    assert_eq!(stored.status, PostStatus::Failed);
    assert_eq!(stored.container_id.as_deref(), Some("container-1"));
    assert_eq!(stored.instagram_media_id, None);
    assert_eq!(api.counts().publish_container, 1);
}

#[tokio::test]
async fn test_status_call_error_is_not_retried() {
    let mock = MockInstagram::status_failure("Upstream status endpoint unavailable");
    let (service, api, _tmp) = setup_service(mock, 5).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let result = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await;

    match result {
        Err(GramcastError::PublishFailed { message, .. }) => {
            assert!(message.contains("Upstream status endpoint unavailable"));
        }
        other => panic!("Expected publish-failed error, got {:?}", other),
    }

    // A thrown status call fails the post; it does not consume more attempts
    assert_eq!(api.counts().container_status, 1);
}

#[tokio::test]
async fn test_permalink_failure_leaves_post_published() {
    let mock = MockInstagram::permalink_failure("permalink backend down");
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let post = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await
        .unwrap();

    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.instagram_media_id.as_deref(), Some("media-1"));
    assert_eq!(post.permalink, None);
    assert_eq!(post.error_message, None);
    assert_eq!(api.counts().fetch_permalink, 1);

    let stored = service.publishing().get_post(&post.id).await.unwrap();
    assert_eq!(stored.status, PostStatus::Published);
    assert_eq!(stored.permalink, None);
}

#[tokio::test]
async fn test_post_without_available_permalink() {
    let mock = MockInstagram::new(MockInstagramConfig {
        permalink: None,
        ..Default::default()
    });
    let (service, _api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let post = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/sunset.jpg",
            None,
            MediaKind::Image,
        ))
        .await
        .unwrap();

    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.permalink, None);
}

#[tokio::test]
async fn test_failed_post_stays_failed_and_resubmission_is_a_new_post() {
    let mock = MockInstagram::with_statuses(Vec::new(), ContainerStatus::InProgress);
    let (service, _api, _tmp) = setup_service(mock, 2).await;
    let account = service.accounts().connect("code1").await.unwrap();

    let first = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/slow.jpg",
            None,
            MediaKind::Image,
        ))
        .await;
    let first_id = match first {
        Err(GramcastError::PublishFailed { post_id, .. }) => post_id,
        other => panic!("Expected publish-failed error, got {:?}", other),
    };

    let second = service
        .publishing()
        .create_post(request(
            &account.id,
            "https://cdn.example.com/slow.jpg",
            None,
            MediaKind::Image,
        ))
        .await;
    let second_id = match second {
        Err(GramcastError::PublishFailed { post_id, .. }) => post_id,
        other => panic!("Expected publish-failed error, got {:?}", other),
    };

    assert_ne!(first_id, second_id);
    let posts = service.publishing().list_posts().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.status == PostStatus::Failed));
}

#[tokio::test]
async fn test_concurrent_posts_run_independently() {
    let mock = MockInstagram::with_statuses(Vec::new(), ContainerStatus::Finished);
    let (service, api, _tmp) = setup_service(mock, 3).await;
    let account = service.accounts().connect("code1").await.unwrap();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..3 {
        let service = Arc::clone(&service);
        let account_id = account.id.clone();
        handles.push(tokio::spawn(async move {
            service
                .publishing()
                .create_post(PostRequest {
                    account_id,
                    media_url: format!("https://cdn.example.com/photo-{}.jpg", i),
                    caption: None,
                    media_kind: Some(MediaKind::Image),
                })
                .await
        }));
    }

    let mut post_ids = Vec::new();
    for result in futures::future::join_all(handles).await {
        let post = result.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Published);
        post_ids.push(post.id);
    }

    post_ids.sort();
    post_ids.dedup();
    assert_eq!(post_ids.len(), 3);
    assert_eq!(api.counts().create_container, 3);
    assert_eq!(api.counts().publish_container, 3);
    assert_eq!(service.publishing().list_posts().await.unwrap().len(), 3);
}
