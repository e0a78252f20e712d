//! Integration tests for `VimeoClient` using wiremock HTTP mocks.

use vidstats_core::{DateRange, Platform};
use vidstats_platforms::{PlatformError, VimeoClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, user_id: Option<&str>) -> VimeoClient {
    VimeoClient::with_base_url("test-token", user_id, 30, 3, 0, base_url)
        .expect("client construction should not fail")
}

fn test_range() -> DateRange {
    DateRange::parse("2024-01-01", "2024-01-03").expect("valid range")
}

fn video_json(uri: &str, created: &str, plays: f64) -> serde_json::Value {
    serde_json::json!({
        "uri": uri,
        "name": "Sunday Service",
        "created_time": created,
        "duration": 5400,
        "stats": { "plays": plays },
        "metadata": { "connections": { "likes": { "total": 12 }, "comments": { "total": 2 } } }
    })
}

#[tokio::test]
async fn fetch_stats_returns_one_record_per_video_per_day() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": [ video_json("/videos/76979871", "2023-12-31T09:00:00Z", 250.0) ],
        "paging": { "next": null }
    });
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let records = test_client(&server.uri(), Some("42"))
        .fetch_stats(&test_range())
        .await
        .expect("fetch should succeed");

    // 1 video x 3 days
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.platform == Platform::Vimeo));
    assert!(records.iter().all(|r| r.video_id == "76979871"));
    assert_eq!(records[0].metrics.get("views"), Some(&250.0));
    assert_eq!(records[0].metrics.get("likes"), Some(&12.0));
    assert_eq!(records[0].metrics.get("comments"), Some(&2.0));
    assert_eq!(records[0].metrics.get("duration_minutes"), Some(&90.0));
}

#[tokio::test]
async fn fetch_stats_resolves_user_via_me_when_unconfigured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uri": "/users/777",
            "name": "Test Account"
        })))
        .mount(&server)
        .await;

    let body = serde_json::json!({
        "data": [ video_json("/videos/1", "2024-01-01T09:00:00Z", 10.0) ],
        "paging": { "next": null }
    });
    Mock::given(method("GET"))
        .and(path("/users/777/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let records = test_client(&server.uri(), None)
        .fetch_stats(&test_range())
        .await
        .expect("fetch should succeed");
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn fetch_stats_follows_paging_next() {
    let server = MockServer::start().await;

    let page2 = serde_json::json!({
        "data": [ video_json("/videos/2", "2024-01-01T11:00:00Z", 20.0) ],
        "paging": { "next": null }
    });
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page2))
        .mount(&server)
        .await;

    let page1 = serde_json::json!({
        "data": [ video_json("/videos/1", "2024-01-01T09:00:00Z", 10.0) ],
        "paging": { "next": "/users/42/videos?page=2" }
    });
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page1))
        .mount(&server)
        .await;

    let records = test_client(&server.uri(), Some("42"))
        .fetch_stats(&test_range())
        .await
        .expect("fetch should succeed");
    assert_eq!(records.len(), 6, "both pages' videos contribute records");
}

#[tokio::test]
async fn rejected_token_surfaces_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = test_client(&server.uri(), Some("42"))
        .fetch_stats(&test_range())
        .await;
    assert!(matches!(result, Err(PlatformError::Auth(_))));
}

#[tokio::test]
async fn missing_user_yields_empty_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let records = test_client(&server.uri(), Some("42"))
        .fetch_stats(&test_range())
        .await
        .expect("missing user is absorbed, not fatal");
    assert!(records.is_empty());
}

#[tokio::test]
async fn rate_limit_is_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let body = serde_json::json!({
        "data": [ video_json("/videos/1", "2024-01-01T09:00:00Z", 10.0) ],
        "paging": { "next": null }
    });
    Mock::given(method("GET"))
        .and(path("/users/42/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let records = test_client(&server.uri(), Some("42"))
        .fetch_stats(&test_range())
        .await
        .expect("should succeed after rate-limit retry");
    assert_eq!(records.len(), 3);
}
