//! YouTube Data API v3 response types.
//!
//! Only the fields the adapter reads are modeled. Note that the `statistics`
//! object reports counters as JSON *strings*, not numbers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `channels.list` response: `{ "items": [ { "contentDetails": ... } ] }`.
#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    #[serde(rename = "contentDetails")]
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

/// `playlistItems.list` response page.
#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

/// `videos.list` response.
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
pub struct VideoSnippet {
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
}

/// Per-video counters. All values arrive as decimal strings.
#[derive(Debug, Default, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
    #[serde(rename = "favoriteCount")]
    pub favorite_count: Option<String>,
}
