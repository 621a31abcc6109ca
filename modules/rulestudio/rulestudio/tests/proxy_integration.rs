//! Engine proxy through the console router

use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use rulestudio::settings::NewServer;
use rulestudio::test_support::{MockEngine, build_test_app_state, test_router};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn header_target_forwards_method_path_query_and_body() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/engine/streams?kind=lookup")
                .header("x-target-url", format!("{}/", engine.base_url()))
                .header("content-type", "application/json")
                .header("authorization", "Bearer abc")
                .body(Body::from(r#"{"sql":"CREATE STREAM s () WITH (DATASOURCE=\"t\")"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-engine-echo").unwrap(), "1");
    let body = body_json(response).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/streams");
    assert_eq!(body["query"], "kind=lookup");
    assert_eq!(
        body["body"]["sql"],
        "CREATE STREAM s () WITH (DATASOURCE=\"t\")"
    );

    let recorded = engine.recorded_requests().await;
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].header("x-target-url").is_none());
    assert_eq!(recorded[0].header("authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn active_server_is_used_without_header() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = build_test_app_state(dir.path()).await;
    state
        .store()
        .add_server(NewServer {
            name: "local".into(),
            url: engine.base_url(),
            description: None,
        })
        .await
        .unwrap();

    let response = test_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/engine/rules/r1/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["path"], "/rules/r1/status");
}

#[tokio::test]
async fn engine_root_is_reachable() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/")
                .header("x-target-url", engine.base_url())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["path"], "/");
}

#[tokio::test]
async fn missing_target_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "no_target");
}

#[tokio::test]
async fn relative_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/rules")
                .header("x-target-url", "engine:9081/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn unreachable_engine_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/ping")
                .header("x-target-url", "http://127.0.0.1:1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "upstream_unreachable");
}

#[tokio::test]
async fn slow_engine_is_gateway_timeout() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/slow")
                .header("x-target-url", engine.base_url())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(response).await["error"], "upstream_timeout");
}

#[tokio::test]
async fn engine_error_status_and_body_are_relayed() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/engine/status/404")
                .header("x-target-url", engine.base_url())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": 1000, "message": "status 404"})
    );
}

#[tokio::test]
async fn oversized_body_is_rejected_before_forwarding() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(build_test_app_state(dir.path()).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/engine/streams")
                .header("x-target-url", engine.base_url())
                .header("content-length", "4096")
                .body(Body::from(vec![b'x'; 4096]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(engine.recorded_requests().await.is_empty());
}

#[tokio::test]
async fn successful_mutations_are_logged_as_activity() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = build_test_app_state(dir.path()).await;
    let app = test_router(state.clone());

    for (method, uri) in [
        ("POST", "/api/engine/rules/r1/start"),
        ("GET", "/api/engine/rules"),
        ("POST", "/api/engine/batch/req"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("x-target-url", engine.base_url())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let activity = state.store().recent_activity(None).await;
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].action, "engine.post");
    assert_eq!(activity[0].target, "/rules/r1/start");
    assert_eq!(activity[0].detail.as_deref(), Some(engine.base_url().as_str()));
}
