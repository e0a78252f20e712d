//! Run orchestration: fetch from every platform, reconcile, publish.
//!
//! A run walks `Init -> Fetching -> Reconciling -> Publishing -> Done`, or
//! drops to `Failed` when every platform fails or a sink gives out. A single
//! platform failing is recorded and absorbed; the other platforms' records
//! still flow through.

use futures::future::join_all;
use sqlx::PgPool;

use vidstats_core::{DateRange, PublishPolicy, RunSummary, SinkReport, VideoStatRecord};
use vidstats_platforms::PlatformAdapter;

use crate::publish::{publish, StatSink};
use crate::reconcile::reconcile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    Fetching,
    Reconciling,
    Publishing,
    Done,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Drives one end-to-end run over a set of platform adapters and sinks.
///
/// Sinks are written in the order they were added; the summary's write
/// counts are summed across them. When a bookkeeping pool is attached, each
/// non-dry run also gets an `ingest_runs` row.
pub struct Orchestrator {
    adapters: Vec<Box<dyn PlatformAdapter>>,
    sinks: Vec<Box<dyn StatSink>>,
    pool: Option<PgPool>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            sinks: Vec::new(),
            pool: None,
        }
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: Box<dyn PlatformAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn StatSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Attaches a pool used only for `ingest_runs` bookkeeping rows.
    #[must_use]
    pub fn with_run_bookkeeping(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Executes one run and returns its summary.
    ///
    /// Never returns an error: every failure mode is folded into the
    /// summary, with `fatal` set when the run as a whole did not succeed.
    pub async fn run(
        &self,
        range: &DateRange,
        policy: PublishPolicy,
        trigger_source: &str,
    ) -> RunSummary {
        // Dry runs leave no bookkeeping trace.
        let run_id = if policy.dry_run {
            None
        } else {
            self.create_run_row(range, trigger_source).await
        };
        self.run_prepared(range, policy, run_id).await
    }

    /// Like [`Orchestrator::run`] but against an `ingest_runs` row created by
    /// the caller, still in `queued` status. The HTTP front door uses this to
    /// return the run id before the pipeline starts.
    pub async fn run_prepared(
        &self,
        range: &DateRange,
        policy: PublishPolicy,
        run_id: Option<i64>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut state = RunState::Init;
        tracing::info!(%range, ?policy, run_id, %state, "run starting");

        if let (Some(pool), Some(id)) = (self.pool.as_ref(), run_id) {
            if let Err(e) = vidstats_db::start_ingest_run(pool, id).await {
                tracing::warn!(run_id = id, error = %e, "failed to start ingest run row");
            }
        }

        state = RunState::Fetching;
        tracing::info!(%state, platforms = self.adapters.len(), "fetching");
        let records = self.fetch_all(range, &mut summary).await;

        if !self.adapters.is_empty() && summary.errors.len() == self.adapters.len() {
            state = RunState::Failed;
            summary.fatal = Some("all platforms failed to fetch".to_string());
            tracing::error!(%state, "every platform failed; nothing to publish");
            self.finish_run_row(run_id, &summary).await;
            return summary;
        }

        state = RunState::Reconciling;
        let merged = reconcile(records);
        summary.reconciled = merged.len();
        tracing::info!(%state, reconciled = summary.reconciled, "reconciled");

        state = RunState::Publishing;
        tracing::info!(%state, sinks = self.sinks.len(), "publishing");
        for sink in &self.sinks {
            match publish(sink.as_ref(), &merged, range, policy).await {
                Ok(report) => {
                    summary.sink_reports.push(SinkReport {
                        sink: sink.name().to_string(),
                        written: report.written,
                        skipped: report.skipped,
                        overwritten: report.overwritten,
                    });
                }
                Err(e) => {
                    summary.written = e.committed.len();
                    summary.fatal = Some(e.to_string());
                    state = RunState::Failed;
                    tracing::error!(
                        %state,
                        error = %e,
                        committed = ?e.committed,
                        "publish failed"
                    );
                    summary.committed_before_failure = e.committed;
                    self.finish_run_row(run_id, &summary).await;
                    return summary;
                }
            }
        }

        // Record-level counts come from the last sink written; the per-sink
        // breakdown stays in sink_reports.
        if let Some(last) = summary.sink_reports.last() {
            summary.written = last.written;
            summary.skipped = last.skipped;
            summary.overwritten = last.overwritten;
        }

        state = RunState::Done;
        tracing::info!(
            %state,
            fetched = summary.total_fetched(),
            written = summary.written,
            skipped = summary.skipped,
            overwritten = summary.overwritten,
            platform_errors = summary.errors.len(),
            "run complete"
        );
        self.finish_run_row(run_id, &summary).await;
        summary
    }

    /// Fetches from every adapter concurrently, recording per-platform
    /// failures into the summary instead of aborting.
    async fn fetch_all(
        &self,
        range: &DateRange,
        summary: &mut RunSummary,
    ) -> Vec<VideoStatRecord> {
        let fetches = self.adapters.iter().map(|adapter| async move {
            let platform = adapter.platform();
            (platform, adapter.fetch_stats(range).await)
        });

        let mut records = Vec::new();
        for (platform, result) in join_all(fetches).await {
            match result {
                Ok(batch) => {
                    tracing::info!(%platform, records = batch.len(), "platform fetch complete");
                    summary.record_fetched(platform, batch.len());
                    records.extend(batch);
                }
                Err(e) => {
                    tracing::error!(%platform, error = %e, "platform fetch failed");
                    summary.record_failure(platform, e.to_string());
                }
            }
        }
        records
    }

    /// Bookkeeping failures are logged and absorbed; they never block the
    /// pipeline itself.
    async fn create_run_row(&self, range: &DateRange, trigger_source: &str) -> Option<i64> {
        let pool = self.pool.as_ref()?;
        match vidstats_db::create_ingest_run(pool, trigger_source, range.start(), range.end())
            .await
        {
            Ok(row) => Some(row.id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create ingest run row");
                None
            }
        }
    }

    async fn finish_run_row(&self, run_id: Option<i64>, summary: &RunSummary) {
        let (Some(pool), Some(id)) = (self.pool.as_ref(), run_id) else {
            return;
        };
        let written = i32::try_from(summary.written).unwrap_or(i32::MAX);
        let skipped = i32::try_from(summary.skipped).unwrap_or(i32::MAX);
        let result = match &summary.fatal {
            None => vidstats_db::complete_ingest_run(pool, id, written, skipped).await,
            Some(message) => {
                vidstats_db::fail_ingest_run(pool, id, message, written, skipped).await
            }
        };
        if let Err(e) = result {
            tracing::warn!(run_id = id, error = %e, "failed to finish ingest run row");
        }
    }
}
