//! HTTP client for the YouTube Data API v3.
//!
//! Resolves the channel's uploads playlist, pages through it, and batches
//! `videos.list` calls to collect per-video statistics. The API key travels
//! as the `key` query parameter on every request.

mod normalize;
mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;

use vidstats_core::{DateRange, Platform, VideoStatRecord};

use crate::error::PlatformError;
use crate::http::{check_status, parse_json};
use crate::retry::retry_with_backoff;
use crate::PlatformAdapter;

use types::{ChannelListResponse, PlaylistItemsResponse, VideoListResponse};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Page size for `playlistItems.list` and batch size for `videos.list` —
/// both capped at 50 by the API.
const PAGE_SIZE: usize = 50;

/// Upper bound on playlist items walked in one fetch, to keep a runaway
/// channel from turning one run into thousands of requests.
const MAX_VIDEOS: usize = 2_000;

/// Client for the YouTube Data API.
///
/// Use [`YoutubeClient::new`] for production or
/// [`YoutubeClient::with_base_url`] to point at a mock server in tests.
pub struct YoutubeClient {
    client: Client,
    api_key: String,
    channel_id: String,
    base_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl YoutubeClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        channel_id: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlatformError> {
        Self::with_base_url(
            api_key,
            channel_id,
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
    /// Returns [`PlatformError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        channel_id: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("vidstats/0.1 (video-statistics)")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            channel_id: channel_id.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches per-video, per-day statistics for the configured channel.
    ///
    /// A vanished channel (`NotFound`) is absorbed here: the fetch logs a
    /// warning and yields an empty set instead of failing the platform.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Auth`] if the API key is rejected.
    /// - [`PlatformError::Http`] once transient-error retries are exhausted.
    /// - [`PlatformError::Deserialize`] if a response does not match the
    ///   expected shape.
    pub async fn fetch_stats(
        &self,
        range: &DateRange,
    ) -> Result<Vec<VideoStatRecord>, PlatformError> {
        let playlist_id = match self.uploads_playlist_id().await {
            Ok(id) => id,
            Err(PlatformError::NotFound { resource }) => {
                tracing::warn!(%resource, "YouTube channel not found — yielding no records");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let video_ids = self.collect_video_ids(&playlist_id).await?;
        tracing::debug!(
            channel_id = %self.channel_id,
            videos = video_ids.len(),
            "collected uploads playlist"
        );

        let fetched_at = Utc::now();
        let mut records = Vec::new();
        for chunk in video_ids.chunks(PAGE_SIZE) {
            let response = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                self.fetch_video_batch(chunk)
            })
            .await?;
            for item in &response.items {
                records.extend(normalize::records_for_video(item, range, fetched_at));
            }
        }

        Ok(records)
    }

    /// Resolves the channel's uploads playlist via `channels.list`.
    async fn uploads_playlist_id(&self) -> Result<String, PlatformError> {
        let response: ChannelListResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || async {
                let resource = format!("channels/{}", self.channel_id);
                let resp = self
                    .client
                    .get(format!("{}/channels", self.base_url))
                    .query(&[
                        ("part", "contentDetails"),
                        ("id", self.channel_id.as_str()),
                        ("key", self.api_key.as_str()),
                    ])
                    .send()
                    .await?;
                let resp = check_status(resp, &resource)?;
                parse_json(resp, &resource).await
            })
            .await?;

        response
            .items
            .into_iter()
            .next()
            .map(|item| item.content_details.related_playlists.uploads)
            .ok_or_else(|| PlatformError::NotFound {
                resource: format!("channels/{}", self.channel_id),
            })
    }

    /// Walks the uploads playlist collecting video ids, up to [`MAX_VIDEOS`].
    async fn collect_video_ids(&self, playlist_id: &str) -> Result<Vec<String>, PlatformError> {
        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                self.fetch_playlist_page(playlist_id, page_token.as_deref())
            })
            .await?;

            video_ids.extend(
                page.items
                    .into_iter()
                    .map(|item| item.content_details.video_id),
            );

            page_token = page.next_page_token;
            if page_token.is_none() || video_ids.len() >= MAX_VIDEOS {
                break;
            }
        }

        video_ids.truncate(MAX_VIDEOS);
        Ok(video_ids)
    }

    async fn fetch_playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, PlatformError> {
        let resource = format!("playlistItems/{playlist_id}");
        let mut request = self
            .client
            .get(format!("{}/playlistItems", self.base_url))
            .query(&[
                ("part", "contentDetails".to_owned()),
                ("playlistId", playlist_id.to_owned()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("key", self.api_key.clone()),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        let resp = request.send().await?;
        let resp = check_status(resp, &resource)?;
        parse_json(resp, &resource).await
    }

    async fn fetch_video_batch(&self, ids: &[String]) -> Result<VideoListResponse, PlatformError> {
        let joined = ids.join(",");
        let resource = format!("videos/{joined}");
        let resp = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", joined.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let resp = check_status(resp, &resource)?;
        parse_json(resp, &resource).await
    }
}

impl PlatformAdapter for YoutubeClient {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn fetch_stats<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VideoStatRecord>, PlatformError>> + Send + 'a>>
    {
        Box::pin(YoutubeClient::fetch_stats(self, range))
    }
}
