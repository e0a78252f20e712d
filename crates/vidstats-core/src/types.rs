//! Shared data model for the ingestion pipeline.
//!
//! One [`VideoStatRecord`] is a single observation of one video's metrics on
//! one calendar day on one platform. The `(platform, video_id, date)` triple
//! is the unique key throughout the pipeline and in every sink.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Video platform a statistic was observed on.
///
/// Platforms are disjoint identity spaces: the same `video_id` string on two
/// platforms names two unrelated videos, so the platform is always part of
/// the identifying triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Vimeo,
}

impl Platform {
    /// All platforms the pipeline knows about, in canonical sort order.
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Vimeo];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Vimeo => "vimeo",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "vimeo" => Ok(Platform::Vimeo),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// The unique key for one statistics observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripleKey {
    pub platform: Platform,
    pub video_id: String,
    pub date: NaiveDate,
}

impl std::fmt::Display for TripleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.platform, self.video_id, self.date)
    }
}

/// One observation of a video's metrics on one day.
///
/// `metrics` maps canonical metric names (`views`, `likes`, `comments`, ...)
/// to values. The key set varies by platform — each adapter applies its own
/// fixed translation table, so vendor field names never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStatRecord {
    pub platform: Platform,
    pub video_id: String,
    pub date: NaiveDate,
    pub metrics: BTreeMap<String, f64>,
    pub fetched_at: DateTime<Utc>,
}

impl VideoStatRecord {
    #[must_use]
    pub fn key(&self) -> TripleKey {
        TripleKey {
            platform: self.platform,
            video_id: self.video_id.clone(),
            date: self.date,
        }
    }
}

#[derive(Debug, Error)]
pub enum DateRangeError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("invalid date \"{input}\": expected YYYY-MM-DD")]
    InvalidDate { input: String },
}

/// Inclusive calendar date range driving one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a validated range. A single-day range (`start == end`) is valid.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::StartAfterEnd`] if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses two ISO-8601 (`YYYY-MM-DD`) date strings into a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::InvalidDate`] on malformed input and
    /// [`DateRangeError::StartAfterEnd`] if the parsed start is after the end.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let parse_one = |input: &str| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| DateRangeError::InvalidDate {
                input: input.to_owned(),
            })
        };
        Self::new(parse_one(start)?, parse_one(end)?)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the range, inclusive of both endpoints.
    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterates every day in the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let end = self.end;
        std::iter::successors(Some(start), move |d| {
            d.checked_add_days(Days::new(1)).filter(|next| *next <= end)
        })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Governs how the publisher treats records already present in a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPolicy {
    /// Report what would be written without mutating any sink.
    pub dry_run: bool,
    /// Replace existing records for matching triples instead of skipping them.
    pub overwrite: bool,
}

/// A per-platform fatal failure recorded during a run.
///
/// These do not abort the run on their own; the other platform's records
/// still flow through reconciliation and publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub message: String,
}

/// Per-sink outcome of the publish stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReport {
    pub sink: String,
    pub written: usize,
    pub skipped: usize,
    pub overwritten: usize,
}

/// Aggregate report of one pipeline execution.
///
/// Created when the run starts, mutated by each stage, returned at the end.
/// Never persisted itself — the `ingest_runs` bookkeeping row is a separate
/// projection of it.
///
/// `written`/`skipped`/`overwritten` count records, not sink writes: with
/// multiple sinks attached they reflect the last sink written (the Postgres
/// sink in the default configuration), and `sink_reports` carries the
/// per-sink breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records fetched per platform, counted after adapter normalization.
    pub fetched: BTreeMap<Platform, usize>,
    /// Records in the unified set after reconciliation.
    pub reconciled: usize,
    /// Records written (inserted or overwritten) by the publisher.
    pub written: usize,
    /// Records skipped because their triple already existed in the sink.
    pub skipped: usize,
    /// Subset of `written` that replaced an existing triple.
    pub overwritten: usize,
    /// Outcome per sink, in the order the sinks were written.
    pub sink_reports: Vec<SinkReport>,
    /// Per-platform fatal errors absorbed during fetch.
    pub errors: Vec<PlatformFailure>,
    /// Triples durably committed before a mid-publish failure. Empty unless
    /// `fatal` is set by a sink failure.
    pub committed_before_failure: Vec<TripleKey>,
    /// Description of the unrecoverable error when the run failed.
    pub fatal: Option<String>,
}

impl RunSummary {
    pub fn record_fetched(&mut self, platform: Platform, count: usize) {
        *self.fetched.entry(platform).or_insert(0) += count;
    }

    pub fn record_failure(&mut self, platform: Platform, message: impl Into<String>) {
        self.errors.push(PlatformFailure {
            platform,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn total_fetched(&self) -> usize {
        self.fetched.values().sum()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.fatal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn platform_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Platform::Youtube).unwrap(),
            "\"youtube\""
        );
        assert_eq!(serde_json::to_string(&Platform::Vimeo).unwrap(), "\"vimeo\"");
    }

    #[test]
    fn platform_round_trips_through_from_str() {
        for p in Platform::ALL {
            assert_eq!(p.as_str().parse::<Platform>().unwrap(), p);
        }
        assert!("dailymotion".parse::<Platform>().is_err());
    }

    #[test]
    fn single_day_range_is_valid() {
        let range = DateRange::parse("2024-01-01", "2024-01-01").unwrap();
        assert_eq!(range.num_days(), 1);
        assert_eq!(range.days().collect::<Vec<_>>(), vec![date("2024-01-01")]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = DateRange::parse("2024-01-03", "2024-01-01");
        assert!(matches!(result, Err(DateRangeError::StartAfterEnd { .. })));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = DateRange::parse("01/03/2024", "2024-01-05");
        assert!(
            matches!(result, Err(DateRangeError::InvalidDate { ref input }) if input == "01/03/2024")
        );
    }

    #[test]
    fn days_iterates_inclusive_endpoints() {
        let range = DateRange::parse("2024-01-01", "2024-01-03").unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(
            days,
            vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")]
        );
        assert_eq!(range.num_days(), 3);
    }

    #[test]
    fn contains_respects_bounds() {
        let range = DateRange::parse("2024-01-02", "2024-01-04").unwrap();
        assert!(!range.contains(date("2024-01-01")));
        assert!(range.contains(date("2024-01-02")));
        assert!(range.contains(date("2024-01-04")));
        assert!(!range.contains(date("2024-01-05")));
    }

    #[test]
    fn triple_key_orders_by_platform_then_id_then_date() {
        let a = TripleKey {
            platform: Platform::Youtube,
            video_id: "abc".into(),
            date: date("2024-01-01"),
        };
        let b = TripleKey {
            platform: Platform::Vimeo,
            video_id: "abc".into(),
            date: date("2024-01-01"),
        };
        assert!(a < b, "youtube sorts before vimeo");
    }

    #[test]
    fn summary_accumulates_fetch_counts() {
        let mut summary = RunSummary::default();
        summary.record_fetched(Platform::Youtube, 6);
        summary.record_fetched(Platform::Vimeo, 3);
        summary.record_fetched(Platform::Youtube, 2);
        assert_eq!(summary.fetched[&Platform::Youtube], 8);
        assert_eq!(summary.total_fetched(), 11);
        assert!(!summary.is_failed());
    }
}
