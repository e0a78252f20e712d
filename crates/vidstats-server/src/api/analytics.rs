//! `POST /api/v1/analytics` — kicks off a pipeline run.
//!
//! The handler validates the requested range, creates the `ingest_runs` row,
//! and spawns the pipeline out-of-band, so the response is a `202` with the
//! run id; completion status is observable via `GET /api/v1/runs`.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vidstats_core::{AppConfig, DateRange, PublishPolicy};
use vidstats_pipeline::{CsvSink, Orchestrator, PgSink};
use vidstats_platforms::{PlatformAdapter, VimeoClient, YoutubeClient};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AnalyticsRequest {
    start_date: String,
    end_date: String,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyticsAccepted {
    /// Public id of the bookkeeping row; `null` for dry runs, which leave no
    /// trace.
    run_id: Option<Uuid>,
    status: &'static str,
    message: String,
}

pub(super) async fn start_analytics_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalyticsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AnalyticsAccepted>>), ApiError> {
    let range = DateRange::parse(&body.start_date, &body.end_date)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let policy = PublishPolicy {
        dry_run: body.dry_run,
        overwrite: body.overwrite,
    };

    let orchestrator = build_orchestrator(&state)
        .map_err(|e| ApiError::new(req_id.0.clone(), "internal_error", e.to_string()))?;

    let (public_id, internal_id) = if policy.dry_run {
        (None, None)
    } else {
        let row =
            vidstats_db::create_ingest_run(&state.pool, "api", range.start(), range.end())
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        (Some(row.public_id), Some(row.id))
    };

    tokio::spawn(async move {
        let summary = orchestrator.run_prepared(&range, policy, internal_id).await;
        if let Some(fatal) = &summary.fatal {
            tracing::error!(run_id = ?public_id, %fatal, "api-triggered run failed");
        } else {
            tracing::info!(
                run_id = ?public_id,
                written = summary.written,
                skipped = summary.skipped,
                "api-triggered run complete"
            );
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: AnalyticsAccepted {
                run_id: public_id,
                status: "started",
                message: format!("pipeline run started for {range}"),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

fn build_orchestrator(state: &AppState) -> anyhow::Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new();
    for adapter in build_adapters(&state.config)? {
        orchestrator = orchestrator.with_adapter(adapter);
    }
    Ok(orchestrator
        .with_sink(Box::new(CsvSink::new(state.config.default_csv_path.clone())))
        .with_sink(Box::new(PgSink::new(state.pool.clone())))
        .with_run_bookkeeping(state.pool.clone()))
}

fn build_adapters(config: &AppConfig) -> anyhow::Result<Vec<Box<dyn PlatformAdapter>>> {
    let mut adapters: Vec<Box<dyn PlatformAdapter>> = Vec::new();

    if let (Some(api_key), Some(channel_id)) =
        (&config.youtube_api_key, &config.youtube_channel_id)
    {
        let client = YoutubeClient::new(
            api_key,
            channel_id,
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
        .map_err(|e| anyhow::anyhow!("failed to build YouTube client: {e}"))?;
        adapters.push(Box::new(client));
    }

    if let Some(token) = &config.vimeo_access_token {
        let client = VimeoClient::new(
            token,
            config.vimeo_user_id.as_deref(),
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
        .map_err(|e| anyhow::anyhow!("failed to build Vimeo client: {e}"))?;
        adapters.push(Box::new(client));
    }

    if adapters.is_empty() {
        anyhow::bail!("no platform credentials configured; nothing to fetch");
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_defaults_flags_to_false() {
        let body: AnalyticsRequest = serde_json::from_str(
            r#"{"start_date": "2024-01-01", "end_date": "2024-01-03"}"#,
        )
        .expect("deserialize");
        assert!(!body.dry_run);
        assert!(!body.overwrite);
    }

    #[test]
    fn accepted_response_is_serializable() {
        let accepted = AnalyticsAccepted {
            run_id: Some(Uuid::new_v4()),
            status: "started",
            message: "pipeline run started for 2024-01-01..=2024-01-03".to_string(),
        };
        let json = serde_json::to_string(&accepted).expect("serialize");
        assert!(json.contains("\"status\":\"started\""));
    }

    #[test]
    fn inverted_range_fails_validation() {
        assert!(DateRange::parse("2024-01-03", "2024-01-01").is_err());
    }
}
