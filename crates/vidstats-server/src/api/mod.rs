mod analytics;
mod runs;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use vidstats_core::AppConfig;

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &vidstats_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/analytics", post(analytics::start_analytics_run))
        .route("/api/v1/runs", get(runs::list_runs))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match vidstats_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::PathBuf;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            database_url: None,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            youtube_api_key: None,
            youtube_channel_id: None,
            vimeo_access_token: None,
            vimeo_user_id: None,
            default_csv_path: PathBuf::from("./video_stats.csv"),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_backoff_base_ms: 1000,
        })
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_unknown_code_maps_to_internal_error() {
        let response = ApiError::new("req-1", "internal_error", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn api_response_envelope_serializes_data_and_meta() {
        let response = ApiResponse {
            data: HealthData {
                status: "ok",
                database: "ok",
            },
            meta: ResponseMeta::new("req-42".to_string()),
        };
        let json = serde_json::to_string(&response).expect("serialize envelope");
        assert!(json.contains("\"request_id\":\"req-42\""));
        assert!(json.contains("\"status\":\"ok\""));
    }

    // -------------------------------------------------------------------------
    // Route integration tests (with DB)
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok_with_a_live_pool(pool: sqlx::PgPool) {
        let app = build_app(AppState {
            pool,
            config: test_config(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert_eq!(json["data"]["database"].as_str(), Some("ok"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn runs_endpoint_returns_seeded_run(pool: sqlx::PgPool) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).expect("valid date");
        let row = vidstats_db::create_ingest_run(&pool, "api", start, end)
            .await
            .expect("seed ingest run");

        let app = build_app(AppState {
            pool,
            config: test_config(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/runs")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1, "expected the seeded run");
        assert_eq!(
            data[0]["run_id"].as_str(),
            Some(row.public_id.to_string().as_str())
        );
        assert_eq!(data[0]["trigger_source"].as_str(), Some("api"));
        assert_eq!(data[0]["status"].as_str(), Some("queued"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn analytics_rejects_an_inverted_range(pool: sqlx::PgPool) {
        let app = build_app(AppState {
            pool,
            config: test_config(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analytics")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"start_date": "2024-01-03", "end_date": "2024-01-01"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }
}
