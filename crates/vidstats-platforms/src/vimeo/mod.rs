//! HTTP client for the Vimeo API.
//!
//! Authenticates with a bearer token, pages through the user's videos with
//! `min_date_created`/`max_date_created` filters, and follows `paging.next`
//! until exhausted. If no user id is configured, it is resolved via `GET /me`
//! on each fetch.

mod normalize;
mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;

use vidstats_core::{DateRange, Platform, VideoStatRecord};

use crate::error::PlatformError;
use crate::http::{check_status, parse_json};
use crate::retry::retry_with_backoff;
use crate::PlatformAdapter;

use types::{MeResponse, VideosResponse};

const DEFAULT_BASE_URL: &str = "https://api.vimeo.com";
const ACCEPT_HEADER: &str = "application/vnd.vimeo.*+json;version=3.4";
const PER_PAGE: usize = 100;

/// Only the fields the adapter reads — keeps response payloads small.
const FIELDS: &str = "uri,name,created_time,duration,stats,metadata.connections.likes.total,metadata.connections.comments.total";

/// Upper bound on videos walked in one fetch.
const MAX_VIDEOS: usize = 2_000;

/// Client for the Vimeo REST API.
///
/// Use [`VimeoClient::new`] for production or [`VimeoClient::with_base_url`]
/// to point at a mock server in tests.
pub struct VimeoClient {
    client: Client,
    user_id: Option<String>,
    base_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl VimeoClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Auth`] if the access token contains bytes
    /// that cannot form a header value, or [`PlatformError::Http`] if the
    /// underlying `reqwest::Client` cannot be constructed.
    pub fn new(
        access_token: &str,
        user_id: Option<&str>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlatformError> {
        Self::with_base_url(
            access_token,
            user_id,
            timeout_secs,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same conditions as [`VimeoClient::new`].
    pub fn with_base_url(
        access_token: &str,
        user_id: Option<&str>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| PlatformError::Auth(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("vidstats/0.1 (video-statistics)")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            user_id: user_id.map(str::to_owned),
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches per-video, per-day statistics for the configured user.
    ///
    /// A vanished user (`NotFound`) is absorbed here: the fetch logs a
    /// warning and yields an empty set instead of failing the platform.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Auth`] if the token is rejected.
    /// - [`PlatformError::Http`] once transient-error retries are exhausted.
    /// - [`PlatformError::Deserialize`] if a response does not match the
    ///   expected shape.
    pub async fn fetch_stats(
        &self,
        range: &DateRange,
    ) -> Result<Vec<VideoStatRecord>, PlatformError> {
        let user_id = match &self.user_id {
            Some(id) => id.clone(),
            None => self.resolve_user_id().await?,
        };

        let fetched_at = Utc::now();
        let mut records = Vec::new();
        let mut seen = 0usize;
        let mut page = 1u32;

        loop {
            let response = match retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                self.fetch_videos_page(&user_id, range, page)
            })
            .await
            {
                Ok(r) => r,
                Err(PlatformError::NotFound { resource }) => {
                    tracing::warn!(%resource, "Vimeo user not found — yielding no records");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };

            seen += response.data.len();
            for video in &response.data {
                records.extend(normalize::records_for_video(video, range, fetched_at));
            }

            if response.paging.next.is_none() || response.data.is_empty() || seen >= MAX_VIDEOS {
                break;
            }
            page += 1;
        }

        tracing::debug!(user_id = %user_id, videos = seen, "walked Vimeo video pages");
        Ok(records)
    }

    /// Resolves the authenticated user's id via `GET /me`.
    async fn resolve_user_id(&self) -> Result<String, PlatformError> {
        let me: MeResponse = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async {
            let resp = self
                .client
                .get(format!("{}/me", self.base_url))
                .send()
                .await?;
            let resp = check_status(resp, "me")?;
            parse_json(resp, "me").await
        })
        .await?;

        let user_id = me
            .uri
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned();
        if user_id.is_empty() {
            return Err(PlatformError::Auth(format!(
                "could not extract user id from uri \"{}\"",
                me.uri
            )));
        }
        tracing::debug!(user_id = %user_id, name = ?me.name, "resolved Vimeo user via /me");
        Ok(user_id)
    }

    async fn fetch_videos_page(
        &self,
        user_id: &str,
        range: &DateRange,
        page: u32,
    ) -> Result<VideosResponse, PlatformError> {
        let resource = format!("users/{user_id}/videos?page={page}");
        let resp = self
            .client
            .get(format!("{}/users/{user_id}/videos", self.base_url))
            .query(&[
                ("page", page.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("fields", FIELDS.to_owned()),
                ("sort", "date".to_owned()),
                ("direction", "asc".to_owned()),
                ("min_date_created", format!("{}T00:00:00Z", range.start())),
                ("max_date_created", format!("{}T23:59:59Z", range.end())),
            ])
            .send()
            .await?;
        let resp = check_status(resp, &resource)?;
        parse_json(resp, &resource).await
    }
}

impl PlatformAdapter for VimeoClient {
    fn platform(&self) -> Platform {
        Platform::Vimeo
    }

    fn fetch_stats<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VideoStatRecord>, PlatformError>> + Send + 'a>>
    {
        Box::pin(VimeoClient::fetch_stats(self, range))
    }
}
