//! Tests for the HTTP API, driven through the router with an in-memory store
//! and a hand-set clock.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use homelog::{
    clock::ManualClock, query::DayZone, server::create_router, store::MemoryStore, AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> (Arc<ManualClock>, Router) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2021, 6, 14, 8, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let state = AppState::new(store, clock.clone(), DayZone::Utc);
    (clock, create_router(Arc::new(state)))
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn log_values(app: &Router, clock: &ManualClock, stream: &str, values: &[&str]) {
    for v in values {
        let (status, _) = call(app, "POST", &format!("/api/streams/{stream}?data={v}")).await;
        assert_eq!(status, StatusCode::OK);
        clock.advance(Duration::minutes(5));
    }
}

#[tokio::test]
async fn test_ingest_returns_stamped_sample() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "POST", "/api/streams/pool?data=78.5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stream"], "pool");
    assert_eq!(body["data"]["value"], 78.5);
    assert_eq!(body["data"]["timestamp"], "2021-06-14T08:00:00Z");
    assert!(body["timing"]["total_us"].is_u64());
}

#[tokio::test]
async fn test_pool_aggregates() {
    let (clock, app) = test_app();
    log_values(&app, &clock, "pool", &["78.5", "79.1", "77.9"]).await;

    let (_, min) = call(&app, "GET", "/api/min?stream=pool").await;
    assert_eq!(min["data"]["status"], "ok");
    assert_eq!(min["data"]["value"], 77.9);
    assert_eq!(min["data"]["timestamp"], "2021-06-14T08:10:00Z");

    let (_, max) = call(&app, "GET", "/api/max?stream=pool").await;
    assert_eq!(max["data"]["value"], 79.1);

    let (_, avg) = call(&app, "GET", "/api/avg?stream=pool").await;
    let avg = avg["data"]["value"].as_f64().unwrap();
    assert!((avg - 78.5).abs() < 1e-9);

    let (_, count) = call(&app, "GET", "/api/count?stream=pool").await;
    assert_eq!(count["data"]["count"], 3);

    let (_, latest) = call(&app, "GET", "/api/latest?stream=pool").await;
    assert_eq!(latest["data"]["value"], 77.9);
}

#[tokio::test]
async fn test_empty_day_reports_no_data() {
    let (clock, app) = test_app();
    log_values(&app, &clock, "demand", &["1.5"]).await;

    let (status, body) = call(&app, "GET", "/api/avg?stream=demand&day=2021-06-10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "no_data");
    assert!(body["data"].get("value").is_none());

    let (_, count) = call(&app, "GET", "/api/count?stream=demand&day=2021-06-10").await;
    assert_eq!(count["data"]["count"], 0);
}

#[tokio::test]
async fn test_day_window_selects_calendar_day() {
    let (clock, app) = test_app();
    clock.set(Utc.with_ymd_and_hms(2021, 6, 13, 23, 59, 59).unwrap());
    log_values(&app, &clock, "battery", &["12.1"]).await;
    clock.set(Utc.with_ymd_and_hms(2021, 6, 14, 0, 0, 0).unwrap());
    log_values(&app, &clock, "battery", &["12.4", "12.6"]).await;

    let (_, body) = call(&app, "GET", "/api/summary?stream=battery&day=2021-06-14").await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["min"]["value"], 12.4);
    assert_eq!(body["data"]["max"]["value"], 12.6);
    assert_eq!(body["data"]["latest"]["value"], 12.6);
}

#[tokio::test]
async fn test_ingest_validation() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "POST", "/api/streams/pool?data=warm").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("not a number"));

    let (status, _) = call(&app, "POST", "/api/streams/pool").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "POST", "/api/streams/pool?data=NaN").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was stored by the rejected writes.
    let (_, latest) = call(&app, "GET", "/api/latest?stream=pool").await;
    assert_eq!(latest["data"]["status"], "no_data");
}

#[tokio::test]
async fn test_query_parameter_errors() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "GET", "/api/min").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("stream"));

    let (status, _) = call(&app, "GET", "/api/avg?stream=pool&day=2021-13-40").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "GET",
        "/api/count?stream=pool&start=2021-06-14T10:00:00Z&end=2021-06-14T09:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_explicit_range_is_half_open() {
    let (clock, app) = test_app();
    log_values(&app, &clock, "klgb", &["60", "61", "62"]).await;

    let (_, body) = call(
        &app,
        "GET",
        "/api/data?stream=klgb&start=2021-06-14T08:00:00Z&end=2021-06-14T08:10:00Z",
    )
    .await;
    let samples = body["data"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["value"], 60.0);
    assert_eq!(samples[1]["value"], 61.0);
}

#[tokio::test]
async fn test_status_counts_all_streams() {
    let (clock, app) = test_app();
    log_values(&app, &clock, "pool", &["70", "71"]).await;
    log_values(&app, &clock, "demand", &["0.8"]).await;

    let (status, body) = call(&app, "GET", "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["streams"], serde_json::json!(["demand", "pool"]));
}

#[tokio::test]
async fn test_weekly_summary() {
    let (clock, app) = test_app();
    clock.set(Utc.with_ymd_and_hms(2021, 6, 9, 12, 0, 0).unwrap());
    log_values(&app, &clock, "pool", &["75", "77"]).await;
    clock.set(Utc.with_ymd_and_hms(2021, 6, 14, 9, 0, 0).unwrap());

    let (status, body) = call(&app, "GET", "/api/weekly?stream=pool").await;
    assert_eq!(status, StatusCode::OK);

    let days = body["data"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["day"], "2021-06-07");
    assert_eq!(days[2]["weekday"], "Wed");
    assert_eq!(days[2]["average"]["value"], 76.0);
    assert_eq!(days[3]["average"]["status"], "no_data");
    assert_eq!(body["data"]["week"]["count"], 2);
    assert_eq!(body["data"]["week"]["min"]["value"], 75.0);

    let (status, _) = call(&app, "GET", "/api/weekly?stream=pool&end=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_weekly_at_calendar_edge_is_400() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "GET", "/api/weekly?stream=pool&end=-262143-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = call(&app, "GET", "/api/weekly?stream=pool&end=%2B262142-12-31").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_average_of_huge_values_is_finite() {
    let (clock, app) = test_app();
    log_values(&app, &clock, "demand", &["1e308", "1e308"]).await;

    let (_, min) = call(&app, "GET", "/api/min?stream=demand").await;
    let (_, avg) = call(&app, "GET", "/api/avg?stream=demand").await;
    let (_, max) = call(&app, "GET", "/api/max?stream=demand").await;

    assert_eq!(avg["data"]["status"], "ok");
    let avg = avg["data"]["value"].as_f64().unwrap();
    assert!(min["data"]["value"].as_f64().unwrap() <= avg);
    assert!(avg <= max["data"]["value"].as_f64().unwrap());
}

#[tokio::test]
async fn test_stream_names_are_an_open_namespace() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "POST", "/api/streams/back%20yard%2Fpool?data=71.5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stream"], "back yard/pool");

    let (_, latest) = call(&app, "GET", "/api/latest?stream=back%20yard%2Fpool").await;
    assert_eq!(latest["data"]["value"], 71.5);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (clock, app) = test_app();

    let (status, body) = call(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    log_values(&app, &clock, "pool", &["70"]).await;
    call(&app, "GET", "/api/min").await;

    let (status, body) = call(&app, "GET", "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_operations"], 2);
    assert_eq!(body["total_errors"], 1);
    assert_eq!(body["per_operation"]["ingest"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_, app) = test_app();

    let (status, body) = call(&app, "GET", "/api/plot").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_responses_carry_timing_headers() {
    let (_, app) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/latest?stream=pool")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-response-time-us"));
    assert!(response.headers().contains_key("server-timing"));
}
