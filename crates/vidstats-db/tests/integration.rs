//! Offline unit tests for vidstats-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use vidstats_core::AppConfig;
use vidstats_db::{IngestRunRow, PoolConfig, VideoStatRow};

fn test_app_config() -> AppConfig {
    AppConfig {
        database_url: Some("postgres://example".to_string()),
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        youtube_api_key: None,
        youtube_channel_id: None,
        vimeo_access_token: None,
        vimeo_user_id: None,
        default_csv_path: PathBuf::from("./video_stats.csv"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 30,
        max_retries: 3,
        retry_backoff_base_ms: 1000,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&test_app_config());

    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`VideoStatRow`] has all expected
/// fields with the correct types, and that it converts cleanly back into the
/// in-memory record shape. No database required.
#[test]
fn video_stat_row_converts_to_record() {
    use chrono::{NaiveDate, Utc};
    use vidstats_core::Platform;

    let row = VideoStatRow {
        id: 1_i64,
        platform: "youtube".to_string(),
        video_id: "vid-a".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        metrics: serde_json::json!({ "views": 120.0, "likes": 8.0 }),
        fetched_at: Utc::now(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let record = row.into_record().expect("row should decode");
    assert_eq!(record.platform, Platform::Youtube);
    assert_eq!(record.video_id, "vid-a");
    assert_eq!(record.metrics.get("views"), Some(&120.0));
    assert_eq!(record.metrics.get("likes"), Some(&8.0));
}

#[test]
fn video_stat_row_with_unknown_platform_fails_to_decode() {
    use chrono::{NaiveDate, Utc};

    let row = VideoStatRow {
        id: 1_i64,
        platform: "myspace".to_string(),
        video_id: "vid-a".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        metrics: serde_json::json!({}),
        fetched_at: Utc::now(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert!(row.into_record().is_err());
}

/// Compile-time smoke test: confirm that [`IngestRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn ingest_run_row_has_expected_fields() {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    let row = IngestRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        started_at: None,
        completed_at: None,
        records_written: 0_i32,
        records_skipped: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.completed_at.is_none());
    assert_eq!(row.records_written, 0);
    assert_eq!(row.records_skipped, 0);
    assert!(row.error_message.is_none());
}
