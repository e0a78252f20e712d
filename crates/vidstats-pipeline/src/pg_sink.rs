//! Postgres sink backed by the `video_stats` table.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;

use vidstats_core::{DateRange, TripleKey, VideoStatRecord};

use crate::publish::{SinkError, SinkFailure, StatSink};

/// Writes records through `ON CONFLICT` upserts, so the decision to skip or
/// replace happens inside Postgres and concurrent runs cannot race it.
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_all(
        &self,
        records: &[VideoStatRecord],
        overwrite: bool,
    ) -> Result<usize, SinkFailure> {
        let mut committed: Vec<TripleKey> = Vec::new();
        for record in records {
            let result = if overwrite {
                vidstats_db::overwrite_video_stat(&self.pool, record).await
            } else {
                vidstats_db::insert_video_stat_if_absent(&self.pool, record).await
            };
            match result {
                Ok(rows) => {
                    if rows > 0 {
                        committed.push(record.key());
                    }
                }
                Err(e) => {
                    return Err(SinkFailure {
                        committed,
                        error: SinkError::Db(e),
                    })
                }
            }
        }
        Ok(committed.len())
    }
}

impl StatSink for PgSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn existing_triples<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<TripleKey>, SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let triples = vidstats_db::existing_triples(&self.pool, range).await?;
            Ok(triples.into_iter().collect())
        })
    }

    fn write_batch<'a>(
        &'a self,
        records: &'a [VideoStatRecord],
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkFailure>> + Send + 'a>> {
        Box::pin(self.write_all(records, overwrite))
    }
}
