//! Production Instagram Graph API client
//!
//! A thin, stateless wrapper over the HTTP endpoints. Base URLs and
//! credentials come from [`InstagramConfig`]; tokens are passed per call.
//! Responses are decoded here and nowhere else: a payload carrying the
//! platform's error envelope becomes an [`ApiError::Remote`] with the
//! remote message attached, regardless of the HTTP status code.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::InstagramConfig;
use crate::error::{ApiError, Result};
use crate::types::MediaKind;

use super::{CodeExchange, ContainerStatus, InstagramApi, LongLivedToken, Profile};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields requested when fetching the connected user's profile
const PROFILE_FIELDS: &str = "id,username,name,profile_picture_url";

pub struct GraphClient {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    redirect_uri: String,
    api_version: String,
    graph_base: String,
    api_base: String,
}

impl GraphClient {
    pub fn new(config: &InstagramConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            api_version: config.api_version.clone(),
            graph_base: config.graph_base_url.trim_end_matches('/').to_string(),
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Versioned URL under the graph host, e.g. `{base}/v23.0/{path}`
    fn graph_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.graph_base, self.api_version, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| map_reqwest_error(context, e))?;
        read_json(resp, context).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T> {
        let resp = self
            .http
            .post(url)
            .query(query)
            .send()
            .await
            .map_err(|e| map_reqwest_error(context, e))?;
        read_json(resp, context).await
    }
}

#[async_trait::async_trait]
impl InstagramApi for GraphClient {
    async fn exchange_code(&self, code: &str) -> Result<CodeExchange> {
        let url = format!("{}/oauth/access_token", self.api_base);
        debug!("Exchanging authorization code for short-lived token");

        let form = [
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
        ];
        let resp = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_reqwest_error("code exchange", e))?;
        read_json(resp, "code exchange").await
    }

    async fn exchange_long_lived(&self, short_lived_token: &str) -> Result<LongLivedToken> {
        // Token endpoints live unversioned on the graph host
        let url = format!("{}/access_token", self.graph_base);
        debug!("Exchanging short-lived token for long-lived token");

        self.get_json(
            &url,
            &[
                ("grant_type", "ig_exchange_token"),
                ("client_secret", self.app_secret.as_str()),
                ("access_token", short_lived_token),
            ],
            "long-lived token exchange",
        )
        .await
    }

    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken> {
        let url = format!("{}/refresh_access_token", self.graph_base);
        debug!("Refreshing long-lived token");

        self.get_json(
            &url,
            &[
                ("grant_type", "ig_refresh_token"),
                ("access_token", access_token),
            ],
            "token refresh",
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let url = self.graph_url("me");
        debug!("Fetching profile for connected user");

        self.get_json(
            &url,
            &[("fields", PROFILE_FIELDS), ("access_token", access_token)],
            "profile fetch",
        )
        .await
    }

    async fn create_container(
        &self,
        owner_id: &str,
        access_token: &str,
        media_url: &str,
        media_kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<String> {
        let url = self.graph_url(&format!("{}/media", owner_id));
        debug!(owner_id, kind = %media_kind, "Creating media container");

        let mut params = media_params(media_url, media_kind, caption);
        params.push(("access_token", access_token.to_string()));
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let created: CreatedId = self.post_json(&url, &query, "container creation").await?;
        Ok(created.id)
    }

    async fn container_status(
        &self,
        access_token: &str,
        container_id: &str,
    ) -> Result<ContainerStatus> {
        let url = self.graph_url(container_id);

        let status: StatusResponse = self
            .get_json(
                &url,
                &[("fields", "status_code"), ("access_token", access_token)],
                "container status",
            )
            .await?;
        debug!(container_id, status = %status.status_code, "Container status");
        Ok(ContainerStatus::parse(&status.status_code))
    }

    async fn publish_container(
        &self,
        owner_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<String> {
        let url = self.graph_url(&format!("{}/media_publish", owner_id));
        debug!(owner_id, container_id, "Publishing container");

        let published: CreatedId = self
            .post_json(
                &url,
                &[
                    ("creation_id", container_id),
                    ("access_token", access_token),
                ],
                "container publish",
            )
            .await?;
        Ok(published.id)
    }

    async fn fetch_permalink(&self, access_token: &str, media_id: &str) -> Result<Option<String>> {
        let url = self.graph_url(media_id);

        let resp: PermalinkResponse = self
            .get_json(
                &url,
                &[("fields", "permalink"), ("access_token", access_token)],
                "permalink fetch",
            )
            .await?;
        Ok(resp.permalink)
    }
}

/// Media-specific query parameters for container creation
///
/// Reels carry the source as `video_url` plus a `media_type` marker; images
/// carry it as `image_url` with no marker. A missing caption is omitted
/// rather than sent empty.
fn media_params(
    media_url: &str,
    media_kind: MediaKind,
    caption: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = match media_kind {
        MediaKind::Image => vec![("image_url", media_url.to_string())],
        MediaKind::Reels => vec![
            ("video_url", media_url.to_string()),
            ("media_type", "REELS".to_string()),
        ],
    };
    if let Some(caption) = caption {
        params.push(("caption", caption.to_string()));
    }
    params
}

fn map_reqwest_error(context: &str, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Network(format!("{} timed out: {}", context, error))
    } else if error.is_connect() {
        ApiError::Network(format!("{} connection failed: {}", context, error))
    } else {
        ApiError::Network(format!("{} request failed: {}", context, error))
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, context: &str) -> Result<T> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| map_reqwest_error(context, e))?;
    parse_body(status, &bytes, context)
}

/// Decode a response body, honoring the platform's error envelope
///
/// The envelope wins over the HTTP status: some endpoints return it with
/// 200. A non-success status without an envelope still fails, with a body
/// snippet for diagnosis.
fn parse_body<T: DeserializeOwned>(status: StatusCode, bytes: &[u8], context: &str) -> Result<T> {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(bytes) {
        return Err(envelope_to_error(envelope.error).into());
    }
    if !status.is_success() {
        let snippet: String = String::from_utf8_lossy(bytes).chars().take(200).collect();
        return Err(ApiError::remote(format!(
            "{} failed with HTTP {}: {}",
            context,
            status.as_u16(),
            snippet
        ))
        .into());
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ApiError::UnexpectedResponse(format!("{} returned malformed payload: {}", context, e))
            .into()
    })
}

fn envelope_to_error(body: ErrorBody) -> ApiError {
    ApiError::Remote {
        message: body
            .message
            .unwrap_or_else(|| "unknown Instagram error".to_string()),
        error_type: body.error_type,
        code: body.code,
        trace_id: body.fbtrace_id,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<i64>,
    fbtrace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: String,
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    permalink: Option<String>,
}
