//! Publishing: writes the reconciled record set to a sink under a
//! [`PublishPolicy`].
//!
//! Sinks write by triple with upsert semantics, never check-then-write, so
//! two concurrent runs cannot lose each other's updates. The policy decides
//! what happens when a triple already exists: skip it (default), replace it
//! (`overwrite`), or only report what would happen (`dry_run`).

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use vidstats_core::{DateRange, PublishPolicy, TripleKey, VideoStatRecord};

/// A sink-level failure, independent of how many records made it in first.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Db(#[from] vidstats_db::DbError),
    #[error("csv sink i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv sink: malformed line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },
}

/// A mid-batch sink failure. `committed` names the triples durably written
/// before the failure; they are NOT rolled back.
#[derive(Debug)]
pub struct SinkFailure {
    pub committed: Vec<TripleKey>,
    pub error: SinkError,
}

impl From<SinkError> for SinkFailure {
    fn from(error: SinkError) -> Self {
        Self {
            committed: Vec::new(),
            error,
        }
    }
}

/// Publishing failed. `committed` names the triples that landed before the
/// failure, so the caller can report exactly how much of the batch is durable.
#[derive(Debug, Error)]
#[error("sink '{sink}' failed after committing {} of {attempted} records: {source}", .committed.len())]
pub struct PublishError {
    pub sink: &'static str,
    pub committed: Vec<TripleKey>,
    pub attempted: usize,
    #[source]
    pub source: SinkError,
}

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Records written, including overwrites.
    pub written: usize,
    /// Records left untouched because their triple already existed.
    pub skipped: usize,
    /// Subset of `written` that replaced an existing triple.
    pub overwritten: usize,
    /// True when the policy prevented any mutation.
    pub dry_run: bool,
}

/// A destination for reconciled records.
///
/// `write_batch` must be idempotent per triple: with `overwrite` false an
/// existing triple is left untouched and not counted, with `overwrite` true
/// it is replaced in place. Either way the decision happens atomically at
/// the sink, not by inspecting `existing_triples` first.
pub trait StatSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Triples already present in the sink for dates within `range`.
    fn existing_triples<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<TripleKey>, SinkError>> + Send + 'a>>;

    /// Writes the batch, returning the number of records actually written.
    fn write_batch<'a>(
        &'a self,
        records: &'a [VideoStatRecord],
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkFailure>> + Send + 'a>>;
}

/// Publishes `records` to `sink` under `policy`.
///
/// The report's `overwritten`/`skipped` split is classified against the
/// sink's contents as observed at the start of the call; the writes
/// themselves remain atomic per triple.
///
/// # Errors
///
/// Returns [`PublishError`] when the sink fails, carrying how many records
/// were committed before the failure.
pub async fn publish(
    sink: &dyn StatSink,
    records: &[VideoStatRecord],
    range: &DateRange,
    policy: PublishPolicy,
) -> Result<PublishReport, PublishError> {
    let existing = sink.existing_triples(range).await.map_err(|error| {
        PublishError {
            sink: sink.name(),
            committed: Vec::new(),
            attempted: records.len(),
            source: error,
        }
    })?;

    let preexisting = records
        .iter()
        .filter(|r| existing.contains(&r.key()))
        .count();

    if policy.dry_run {
        let report = if policy.overwrite {
            PublishReport {
                written: records.len(),
                skipped: 0,
                overwritten: preexisting,
                dry_run: true,
            }
        } else {
            PublishReport {
                written: records.len() - preexisting,
                skipped: preexisting,
                overwritten: 0,
                dry_run: true,
            }
        };
        tracing::info!(
            sink = sink.name(),
            would_write = report.written,
            would_skip = report.skipped,
            would_overwrite = report.overwritten,
            "dry run: no sink mutated"
        );
        return Ok(report);
    }

    let written = sink
        .write_batch(records, policy.overwrite)
        .await
        .map_err(|failure| PublishError {
            sink: sink.name(),
            committed: failure.committed,
            attempted: records.len(),
            source: failure.error,
        })?;

    let report = if policy.overwrite {
        PublishReport {
            written,
            skipped: 0,
            overwritten: preexisting.min(written),
            dry_run: false,
        }
    } else {
        PublishReport {
            written,
            skipped: records.len() - written,
            overwritten: 0,
            dry_run: false,
        }
    };

    tracing::info!(
        sink = sink.name(),
        written = report.written,
        skipped = report.skipped,
        overwritten = report.overwritten,
        "publish complete"
    );
    Ok(report)
}
