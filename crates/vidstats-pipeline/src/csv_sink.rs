//! CSV sink: a flat-file companion to the Postgres sink.
//!
//! The file is long-format, one line per `(platform, video_id, date, metric)`:
//!
//! ```text
//! platform,video_id,date,metric,value,fetched_at
//! youtube,vid-a,2024-01-01,views,120,2024-01-02T08:00:00+00:00
//! ```
//!
//! Every write loads the file, merges the batch in memory, and rewrites the
//! whole file through a temp file renamed into place, so a crash mid-write
//! never leaves a half-written file behind.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::future::Future;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};

use vidstats_core::{DateRange, Platform, TripleKey, VideoStatRecord};

use crate::publish::{SinkError, SinkFailure, StatSink};

const HEADER: &str = "platform,video_id,date,metric,value,fetched_at";

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all records in the file whose date falls within `range`,
    /// ordered by triple. Used by publish-from-file mode.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] or [`SinkError::MalformedCsv`] if the file
    /// cannot be read or parsed.
    pub fn read_range(&self, range: &DateRange) -> Result<Vec<VideoStatRecord>, SinkError> {
        let records = self.load()?;
        Ok(records
            .into_values()
            .filter(|r| range.contains(r.date))
            .collect())
    }

    /// Loads the whole file into memory. A missing file is an empty sink.
    fn load(&self) -> Result<BTreeMap<TripleKey, VideoStatRecord>, SinkError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(SinkError::Io(e)),
        };

        let mut records: BTreeMap<TripleKey, VideoStatRecord> = BTreeMap::new();
        for (index, line) in contents.lines().enumerate() {
            if index == 0 || line.is_empty() {
                continue;
            }
            let (key, metric, value, fetched_at) = parse_line(line, index + 1)?;
            let entry = records.entry(key.clone()).or_insert_with(|| VideoStatRecord {
                platform: key.platform,
                video_id: key.video_id,
                date: key.date,
                metrics: BTreeMap::new(),
                fetched_at,
            });
            entry.metrics.insert(metric, value);
            entry.fetched_at = entry.fetched_at.max(fetched_at);
        }
        Ok(records)
    }

    /// Rewrites the file from `records` via a temp file in the same
    /// directory, renamed over the target.
    fn store(&self, records: &BTreeMap<TripleKey, VideoStatRecord>) -> Result<(), SinkError> {
        let mut body = String::new();
        body.push_str(HEADER);
        body.push('\n');
        for record in records.values() {
            for (metric, value) in &record.metrics {
                // Never produces a trailing `.0` for integral values.
                let _ = writeln!(
                    body,
                    "{},{},{},{},{},{}",
                    record.platform.as_str(),
                    record.video_id,
                    record.date.format("%Y-%m-%d"),
                    metric,
                    value,
                    record.fetched_at.to_rfc3339(),
                );
            }
        }

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(body.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| SinkError::Io(e.error))?;
        Ok(())
    }

    fn write_all(
        &self,
        records: &[VideoStatRecord],
        overwrite: bool,
    ) -> Result<usize, SinkFailure> {
        let mut current = self.load()?;
        let mut written = 0_usize;
        for record in records {
            let key = record.key();
            if overwrite || !current.contains_key(&key) {
                current.insert(key, record.clone());
                written += 1;
            }
        }
        // Atomic rewrite: either the old file or the fully merged one.
        self.store(&current)?;
        Ok(written)
    }
}

fn parse_line(
    line: &str,
    line_number: usize,
) -> Result<(TripleKey, String, f64, DateTime<Utc>), SinkError> {
    let malformed = |reason: &str| SinkError::MalformedCsv {
        line: line_number,
        reason: reason.to_string(),
    };

    let mut fields = line.splitn(6, ',');
    let platform = fields.next().ok_or_else(|| malformed("missing platform"))?;
    let video_id = fields.next().ok_or_else(|| malformed("missing video_id"))?;
    let date = fields.next().ok_or_else(|| malformed("missing date"))?;
    let metric = fields.next().ok_or_else(|| malformed("missing metric"))?;
    let value = fields.next().ok_or_else(|| malformed("missing value"))?;
    let fetched_at = fields.next().ok_or_else(|| malformed("missing fetched_at"))?;

    let platform: Platform = platform
        .parse()
        .map_err(|_| malformed("unknown platform"))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| malformed("unparseable date"))?;
    let value: f64 = value.parse().map_err(|_| malformed("unparseable value"))?;
    let fetched_at = fetched_at
        .parse::<DateTime<Utc>>()
        .map_err(|_| malformed("unparseable fetched_at"))?;

    Ok((
        TripleKey {
            platform,
            video_id: video_id.to_string(),
            date,
        },
        metric.to_string(),
        value,
        fetched_at,
    ))
}

impl StatSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn existing_triples<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<TripleKey>, SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.load()?;
            Ok(records
                .into_keys()
                .filter(|k| range.contains(k.date))
                .collect())
        })
    }

    fn write_batch<'a>(
        &'a self,
        records: &'a [VideoStatRecord],
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkFailure>> + Send + 'a>> {
        Box::pin(async move { self.write_all(records, overwrite) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vidstats_core::PublishPolicy;

    fn record(video_id: &str, day: &str, views: f64) -> VideoStatRecord {
        let mut metrics = BTreeMap::new();
        metrics.insert("views".to_string(), views);
        metrics.insert("likes".to_string(), 5.0);
        VideoStatRecord {
            platform: Platform::Youtube,
            video_id: video_id.to_string(),
            date: NaiveDate::parse_from_str(day, "%Y-%m-%d").expect("valid test date"),
            metrics,
            fetched_at: "2024-01-04T08:00:00Z"
                .parse::<DateTime<Utc>>()
                .expect("valid test timestamp"),
        }
    }

    fn test_range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-03").expect("valid range")
    }

    #[tokio::test]
    async fn round_trips_records_through_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::new(dir.path().join("stats.csv"));

        let records = vec![record("a", "2024-01-01", 10.0), record("b", "2024-01-02", 20.0)];
        let report = crate::publish::publish(
            &sink,
            &records,
            &test_range(),
            PublishPolicy::default(),
        )
        .await
        .expect("publish should succeed");
        assert_eq!(report.written, 2);

        let loaded = sink.load().expect("load should succeed");
        assert_eq!(loaded.len(), 2);
        let a = loaded.get(&records[0].key()).expect("record a present");
        assert_eq!(a.metrics.get("views"), Some(&10.0));
        assert_eq!(a.metrics.get("likes"), Some(&5.0));
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::new(dir.path().join("absent.csv"));

        let existing = sink
            .existing_triples(&test_range())
            .await
            .expect("missing file is empty, not an error");
        assert!(existing.is_empty());
    }

    #[tokio::test]
    async fn rewrite_without_overwrite_preserves_existing_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::new(dir.path().join("stats.csv"));

        sink.write_all(&[record("a", "2024-01-01", 10.0)], false)
            .expect("seed write");
        let written = sink
            .write_all(&[record("a", "2024-01-01", 99.0), record("b", "2024-01-02", 20.0)], false)
            .expect("merge write");

        assert_eq!(written, 1, "only the new triple lands");
        let loaded = sink.load().expect("load");
        let a = loaded
            .get(&record("a", "2024-01-01", 0.0).key())
            .expect("a kept");
        assert_eq!(a.metrics.get("views"), Some(&10.0), "old value preserved");
    }

    #[tokio::test]
    async fn overwrite_replaces_the_row() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::new(dir.path().join("stats.csv"));

        sink.write_all(&[record("a", "2024-01-01", 10.0)], false)
            .expect("seed write");
        sink.write_all(&[record("a", "2024-01-01", 99.0)], true)
            .expect("overwrite write");

        let loaded = sink.load().expect("load");
        let a = loaded
            .get(&record("a", "2024-01-01", 0.0).key())
            .expect("a present");
        assert_eq!(a.metrics.get("views"), Some(&99.0));
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stats.csv");
        std::fs::write(&path, format!("{HEADER}\nnot-a-platform,x,bad,views,1,bad\n"))
            .expect("write fixture");

        let err = CsvSink::new(path).load().expect_err("should reject");
        assert!(matches!(err, SinkError::MalformedCsv { line: 2, .. }));
    }
}
