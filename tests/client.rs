//! Drives the real `ApiClient` over HTTP against a canned backend.

mod common;

use common::{Route, StubServer};
use iptrends::cache::TtlCache;
use iptrends::model::{TrendClass, TrendFilter};
use iptrends::report::{build_report, build_trademark_report};
use iptrends::{ApiClient, ApiError, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn client_for(server: &StubServer, token: Option<&str>) -> ApiClient {
    let mut cfg = Config::default().with_base(&server.base).unwrap();
    if let Some(t) = token {
        cfg = cfg.with_token(t);
    }
    ApiClient::new(&cfg).unwrap()
}

#[tokio::test]
async fn wrapped_payload_is_normalized_and_token_sent() {
    let server = StubServer::start(vec![(
        "GET /api/analyst/filing-trends",
        Route::ok(json!({"data": [
            {"year": 2021, "filings": "40", "grants": 10},
            {"year": 2020, "filingCount": 20, "grantCount": 10, "grantRate": 50},
        ]})),
    )])
    .await;
    let client = client_for(&server, Some("test-token"));

    let points = client
        .filing_trends(&TrendFilter::years(2020, 2021))
        .await
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].year, 2020);
    assert_eq!(points[1].filing_count, 40.0);
    assert_eq!(points[1].grant_rate, 25.0);

    let seen = server.requests();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].head.contains("authorization: bearer test-token"));
    assert!(seen[0].query.contains("startYear=2020"));
    assert!(seen[0].query.contains("endYear=2021"));
}

#[tokio::test]
async fn no_token_means_no_authorization_header() {
    let server = StubServer::start(vec![(
        "GET /api/analyst/assignee-trends",
        Route::ok(json!([{"assignee": "Acme", "count": 3, "trend": "up"}])),
    )])
    .await;
    let client = client_for(&server, None);

    let assignees = client.assignee_trends(&TrendFilter::default()).await.unwrap();
    assert_eq!(assignees[0].name, "Acme");
    assert_eq!(assignees[0].trend, TrendClass::Rising);
    assert!(!server.requests()[0].head.contains("authorization"));
}

#[tokio::test]
async fn repeated_get_is_served_from_cache() {
    let server = StubServer::start(vec![(
        "GET /api/analyst/country-trends",
        Route::ok(json!([{"code": "US", "count": 9}])),
    )])
    .await;
    let client = client_for(&server, None);
    let filter = TrendFilter::years(2020, 2024);

    client.country_trends(&filter).await.unwrap();
    client.country_trends(&filter).await.unwrap();
    assert_eq!(server.hits("/api/analyst/country-trends"), 1);

    // Different filter, different key
    client.country_trends(&TrendFilter::default()).await.unwrap();
    assert_eq!(server.hits("/api/analyst/country-trends"), 2);

    client.clear_cache();
    client.country_trends(&filter).await.unwrap();
    assert_eq!(server.hits("/api/analyst/country-trends"), 3);
}

#[tokio::test]
async fn shared_cache_keeps_backends_apart() {
    let us = StubServer::start(vec![(
        "GET /api/analyst/country-trends",
        Route::ok(json!([{"code": "US", "count": 9}])),
    )])
    .await;
    let jp = StubServer::start(vec![(
        "GET /api/analyst/country-trends",
        Route::ok(json!([{"code": "JP", "count": 4}])),
    )])
    .await;
    let shared: Arc<TtlCache<Value>> = Arc::new(TtlCache::new(Duration::from_secs(300)));
    let a = client_for(&us, None).with_cache(shared.clone());
    let b = client_for(&jp, None).with_cache(shared.clone());
    let filter = TrendFilter::years(2020, 2024);

    assert_eq!(a.country_trends(&filter).await.unwrap()[0].code, "US");
    assert_eq!(b.country_trends(&filter).await.unwrap()[0].code, "JP");
    assert_eq!(a.country_trends(&filter).await.unwrap()[0].code, "US");
    assert_eq!(b.country_trends(&filter).await.unwrap()[0].code, "JP");

    assert_eq!(us.hits("/api/analyst/country-trends"), 1);
    assert_eq!(jp.hits("/api/analyst/country-trends"), 1);
    assert_eq!(shared.len(), 2);
}

#[tokio::test]
async fn status_error_carries_backend_message() {
    let server = StubServer::start(vec![(
        "GET /api/analyst/technology-trends",
        Route::status(500, r#"{"message":"aggregation timed out"}"#),
    )])
    .await;
    let client = client_for(&server, None);

    let err = client
        .technology_trends(&TrendFilter::default())
        .await
        .unwrap_err();
    let api = err.downcast_ref::<ApiError>().expect("ApiError");
    assert_eq!(api.status(), Some(500));
    assert_eq!(api.to_string(), "aggregation timed out");
    // Failures are not cached
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn unknown_route_gets_fallback_message() {
    let server = StubServer::start(vec![]).await;
    let client = client_for(&server, None);

    let err = client.trademark_classes(&TrendFilter::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed with status 404");
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let cfg = Config::default()
        .with_base(&format!("http://127.0.0.1:{}", port))
        .unwrap();
    let client = ApiClient::new(&cfg).unwrap();

    let err = client.filing_trends(&TrendFilter::default()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Network { .. })
    ));
}

#[tokio::test]
async fn undecodable_body_is_decode_error() {
    let server = StubServer::start(vec![(
        "GET /api/competitors",
        Route::status(200, "{not json"),
    )])
    .await;
    let client = client_for(&server, None);

    let err = client.competitors(None).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Decode { .. })
    ));
}

#[tokio::test]
async fn empty_body_is_empty_data() {
    let server = StubServer::start(vec![(
        "GET /api/competitors",
        Route::status(200, ""),
    )])
    .await;
    let client = client_for(&server, None);

    assert!(client.competitors(Some(5)).await.unwrap().is_empty());
    assert!(server.requests()[0].query.contains("limit=5"));
}

#[tokio::test]
async fn compare_posts_names() {
    let server = StubServer::start(vec![(
        "POST /api/competitors/compare",
        Route::ok(json!({"results": [
            {"name": "Acme", "patentCount": 30},
            {"name": "Globex", "patentCount": 10, "trademarkCount": 4},
        ]})),
    )])
    .await;
    let client = client_for(&server, Some("t"));

    let names = vec!["Acme".to_string(), "Globex".to_string()];
    let comps = client.compare_competitors(&names).await.unwrap();
    assert_eq!(comps.len(), 2);
    assert_eq!(comps[0].share, 75.0);

    let seen = server.requests();
    assert_eq!(seen[0].method, "POST");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, json!({"names": ["Acme", "Globex"]}));
}

#[tokio::test]
async fn report_survives_one_failing_endpoint() {
    let server = StubServer::start(vec![
        (
            "GET /api/analyst/filing-trends",
            Route::ok(json!([{"year": 2023, "filingCount": 100}, {"year": 2024, "filingCount": 130}])),
        ),
        (
            "GET /api/analyst/technology-trends",
            Route::ok(json!({"data": [{"code": "G06N", "count": 12}]})),
        ),
        (
            "GET /api/analyst/assignee-trends",
            Route::ok(json!([{"name": "Acme", "count": 5}])),
        ),
        (
            "GET /api/analyst/country-trends",
            Route::status(503, r#"{"error":"maintenance"}"#),
        ),
    ])
    .await;
    let client = client_for(&server, None);

    let report = build_report(&client, &TrendFilter::default()).await;
    assert_eq!(report.failed_sections, vec!["countryTrends".to_string()]);
    assert!(report.country_trends.is_empty());
    assert_eq!(report.filing_trends.len(), 2);
    assert_eq!(report.technology_trends.len(), 1);
    assert_eq!(report.assignee_trends.len(), 1);
    assert_eq!(report.insights[0].value, 30.0);
}

#[tokio::test]
async fn trademark_report_end_to_end() {
    let server = StubServer::start(vec![
        (
            "GET /api/trends/trademarks/summary",
            Route::ok(json!({"data": {
                "totalApplications": 230,
                "filingsByYear": [{"year": 2023, "count": 100}, {"year": 2024, "count": 130}],
                "recentActivity": 12,
            }})),
        ),
        (
            "GET /api/trends/trademarks/classes",
            Route::ok(json!([{"classCode": "9", "description": "Software", "count": 40}])),
        ),
    ])
    .await;
    let client = client_for(&server, None);

    let report = build_trademark_report(&client, &TrendFilter::default()).await;
    assert!(report.failed_sections.is_empty());
    assert_eq!(report.summary.recent_activity, 12.0);
    assert_eq!(report.classes[0].description, "Software");
    assert_eq!(report.insights.len(), 1);
}
