//! Translation from YouTube payloads to [`VideoStatRecord`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use vidstats_core::{DateRange, Platform, VideoStatRecord};

use super::types::VideoItem;

/// Builds the canonical metrics map from a video's statistics.
///
/// The translation table is fixed: `viewCount → views`, `likeCount → likes`,
/// `commentCount → comments`, `favoriteCount → favorites`. Counters the API
/// omits (e.g. comments disabled) are left out of the map rather than
/// reported as zero.
pub(super) fn metrics_for(item: &VideoItem) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    let mut put = |name: &str, raw: Option<&String>| {
        if let Some(value) = raw.and_then(|v| v.parse::<f64>().ok()) {
            metrics.insert(name.to_owned(), value);
        }
    };
    put("views", item.statistics.view_count.as_ref());
    put("likes", item.statistics.like_count.as_ref());
    put("comments", item.statistics.comment_count.as_ref());
    put("favorites", item.statistics.favorite_count.as_ref());
    metrics
}

/// Rekeys one video's cumulative statistics snapshot to per-day records.
///
/// The Data API reports a single snapshot per video, so the adapter emits the
/// snapshot once for every day of the range on which the video already
/// existed (published on or before that day). Videos published after the
/// range end produce nothing.
pub(super) fn records_for_video(
    item: &VideoItem,
    range: &DateRange,
    fetched_at: DateTime<Utc>,
) -> Vec<VideoStatRecord> {
    let published = item.snippet.published_at.date_naive();
    if published > range.end() {
        return Vec::new();
    }
    let metrics = metrics_for(item);
    range
        .days()
        .filter(|day| *day >= published)
        .map(|day| VideoStatRecord {
            platform: Platform::Youtube,
            video_id: item.id.clone(),
            date: day,
            metrics: metrics.clone(),
            fetched_at,
        })
        .collect()
}
