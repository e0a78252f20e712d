//! Vimeo API response types.
//!
//! Covers `GET /me` and `GET /users/{id}/videos`. Videos are identified by a
//! URI like `/videos/76979871`; the numeric tail is the platform-scoped id.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `GET /me` — used to resolve the user id when it is not configured.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of `GET /users/{id}/videos`.
#[derive(Debug, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub data: Vec<VimeoVideo>,
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VimeoVideo {
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_time: DateTime<Utc>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub stats: Option<VimeoStats>,
    #[serde(default)]
    pub metadata: Option<VideoMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct VimeoStats {
    pub plays: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub connections: Option<VideoConnections>,
}

#[derive(Debug, Deserialize)]
pub struct VideoConnections {
    #[serde(default)]
    pub likes: Option<ConnectionTotal>,
    #[serde(default)]
    pub comments: Option<ConnectionTotal>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionTotal {
    pub total: f64,
}

impl VimeoVideo {
    /// The platform-scoped video id: the last segment of the `uri`.
    #[must_use]
    pub fn video_id(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}
