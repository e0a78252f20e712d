//! Translation from Vimeo payloads to [`VideoStatRecord`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use vidstats_core::{DateRange, Platform, VideoStatRecord};

use super::types::VimeoVideo;

/// Builds the canonical metrics map from a Vimeo video.
///
/// The translation table is fixed: `stats.plays → views`,
/// `metadata.connections.likes.total → likes`,
/// `metadata.connections.comments.total → comments`, and `duration`
/// (seconds) → `duration_minutes`. Absent fields are left out of the map.
pub(super) fn metrics_for(video: &VimeoVideo) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();

    if let Some(plays) = video.stats.as_ref().and_then(|s| s.plays) {
        metrics.insert("views".to_owned(), plays);
    }
    let connections = video.metadata.as_ref().and_then(|m| m.connections.as_ref());
    if let Some(likes) = connections.and_then(|c| c.likes.as_ref()) {
        metrics.insert("likes".to_owned(), likes.total);
    }
    if let Some(comments) = connections.and_then(|c| c.comments.as_ref()) {
        metrics.insert("comments".to_owned(), comments.total);
    }
    if let Some(duration) = video.duration {
        metrics.insert("duration_minutes".to_owned(), duration / 60.0);
    }

    metrics
}

/// Full-length uploads only; shorter videos are clips, not services.
const MIN_DURATION_SECS: f64 = 1_800.0;

/// Rekeys one video's cumulative statistics snapshot to per-day records,
/// one per day of the range on which the video already existed.
///
/// Videos shorter than [`MIN_DURATION_SECS`] are skipped entirely. A video
/// with no reported duration is kept.
pub(super) fn records_for_video(
    video: &VimeoVideo,
    range: &DateRange,
    fetched_at: DateTime<Utc>,
) -> Vec<VideoStatRecord> {
    if video.duration.is_some_and(|d| d < MIN_DURATION_SECS) {
        return Vec::new();
    }
    let created = video.created_time.date_naive();
    if created > range.end() {
        return Vec::new();
    }
    let metrics = metrics_for(video);
    let video_id = video.video_id().to_owned();
    range
        .days()
        .filter(|day| *day >= created)
        .map(|day| VideoStatRecord {
            platform: Platform::Vimeo,
            video_id: video_id.clone(),
            date: day,
            metrics: metrics.clone(),
            fetched_at,
        })
        .collect()
}
