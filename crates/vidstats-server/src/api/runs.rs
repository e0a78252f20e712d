use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestRunItem {
    run_id: Uuid,
    trigger_source: String,
    status: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_written: i32,
    records_skipped: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<IngestRunItem>>>, ApiError> {
    let rows = vidstats_db::list_ingest_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| IngestRunItem {
            run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_written: row.records_written,
            records_skipped: row.records_skipped,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::IngestRunItem;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    #[test]
    fn ingest_run_item_is_serializable() {
        let item = IngestRunItem {
            run_id: Uuid::new_v4(),
            trigger_source: "api".to_string(),
            status: "succeeded".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            records_written: 9,
            records_skipped: 0,
            error_message: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&item).expect("serialize ingest run");
        assert!(json.contains("\"trigger_source\":\"api\""));
        assert!(json.contains("\"records_written\":9"));
    }
}
