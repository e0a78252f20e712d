//! Pipeline stages: reconciliation, publishing, and run orchestration.

mod csv_sink;
mod orchestrate;
mod pg_sink;
mod publish;
mod reconcile;

pub use csv_sink::CsvSink;
pub use orchestrate::Orchestrator;
pub use pg_sink::PgSink;
pub use publish::{publish, PublishError, PublishReport, SinkError, SinkFailure, StatSink};
pub use reconcile::reconcile;
