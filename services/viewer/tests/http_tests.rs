//! Router-level tests: requests go through the full middleware stack.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storage::LocalSource;
use tempfile::TempDir;
use test_utils::DatasetBuilder;
use tower::ServiceExt;
use viewer::{server::create_router, AppState, DisplayMode, ViewerSession};

use common::{config, fixture};

struct TestApp {
    router: Router,
    _dataset: DatasetBuilder,
    _state_dir: TempDir,
}

async fn app(display: DisplayMode) -> TestApp {
    let dataset = fixture();
    let state_dir = tempfile::tempdir().unwrap();
    let cfg = config(&state_dir, display);
    let session = ViewerSession::with_source(
        Arc::new(LocalSource::new(dataset.root())),
        &cfg,
        Some("year=2022&month=7"),
    )
    .await
    .unwrap();
    let state = Arc::new(AppState::from_session(session, cfg));
    TestApp {
        router: create_router(state, None),
        _dataset: dataset,
        _state_dir: state_dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(DisplayMode::Canvas).await;
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_state_reports_current_period() {
    let app = app(DisplayMode::Canvas).await;
    let (status, body) = send(&app.router, get("/state")).await;
    assert_eq!(status, StatusCode::OK);

    let ui: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ui["label"], "July 2022");
    assert_eq!(ui["playback"]["button_label"], "Play");
    assert_eq!(ui["query"], "year=2022&month=7&view=single&layer=rain_sun");
}

#[tokio::test]
async fn test_command_advances_month() {
    let app = app(DisplayMode::Canvas).await;
    let (status, body) = send(
        &app.router,
        post_json("/command", json!({"intent": "ADVANCE_MONTH"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let outcome: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["effects"]["reload"], true);
    assert_eq!(outcome["ui"]["month"], 8);
    assert!(outcome["ui"]["status"].is_null());
}

#[tokio::test]
async fn test_invalid_speed_is_bad_request() {
    let app = app(DisplayMode::Canvas).await;
    let (status, body) = send(
        &app.router,
        post_json("/command", json!({"intent": "SET_SPEED", "speed_ms": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["recoverable"], true);
}

#[tokio::test]
async fn test_key_binding() {
    let app = app(DisplayMode::Canvas).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/key/ArrowLeft")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["ui"]["month"], 6);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/key/q")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_view_png() {
    let app = app(DisplayMode::Canvas).await;
    let response = app.router.clone().oneshot(get("/view.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn test_overlay_requires_map_display() {
    let app = app(DisplayMode::Canvas).await;
    let (status, _) = send(&app.router, get("/overlay")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overlay_bitmap_headers() {
    let app = app(DisplayMode::Map).await;
    let response = app.router.clone().oneshot(get("/overlay")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-overlay-strategy"], "bitmap");
    assert!(response.headers().contains_key("x-overlay-bounds"));
}

#[tokio::test]
async fn test_builtin_location_cannot_be_removed() {
    let app = app(DisplayMode::Canvas).await;
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/locations/woolhampton")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_and_search_locations() {
    let app = app(DisplayMode::Canvas).await;
    let (status, body) = send(
        &app.router,
        post_json("/locations", json!({"name": "Allotment", "x": 455000.0, "y": 170000.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let added: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(added["category"], "Custom");
    assert_eq!(added["is_custom"], true);

    let (status, body) = send(&app.router, get("/locations?q=allot")).await;
    assert_eq!(status, StatusCode::OK);
    let found: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app.router,
        post_json("/locations", json!({"name": "Half", "x": 455000.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
