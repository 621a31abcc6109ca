//! Integration tests for the EngineClient transport
//!
//! These tests use httpmock to simulate engine and proxy endpoints

use httpmock::prelude::*;
use rulestudio_sdk::{ClientConfig, ClientError, EngineClient, EngineTarget, StatusCode};
use serde_json::json;
use std::time::{Duration, Instant};

fn direct_client(server: &MockServer) -> EngineClient {
    EngineClient::new(ClientConfig::direct(&server.base_url()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_direct_get_returns_json() {
    let server = MockServer::start_async().await;

    let mock = server.mock_async(|when, then| {
        when.method(GET).path("/streams").header_missing("x-target-url");
        then.status(200).json_body(json!(["demo", "events"]));
    }).await;

    let client = direct_client(&server);
    let value = client.get("/streams").await.unwrap();

    assert_eq!(value, json!(["demo", "events"]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxied_request_carries_target_header() {
    let proxy = MockServer::start_async().await;

    let mock = proxy.mock_async(|when, then| {
        when.method(POST)
            .path("/api/engine/streams")
            .header("x-target-url", "http://10.0.0.7:9081")
            .header("content-type", "application/json")
            .json_body(json!({"sql": "CREATE STREAM s () WITH (DATASOURCE=\"t\")"}));
        then.status(201).body("Stream s is created.");
    }).await;

    let config = ClientConfig::via_proxy(
        &format!("{}/api/engine", proxy.base_url()),
        "http://10.0.0.7:9081/",
    )
    .unwrap();
    let client = EngineClient::new(config).unwrap();

    let value = client
        .streams()
        .create("CREATE STREAM s () WITH (DATASOURCE=\"t\")")
        .await
        .unwrap();

    assert_eq!(value, json!("Stream s is created."));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_set_target_reroutes_next_request() {
    let first = MockServer::start_async().await;
    let second = MockServer::start_async().await;

    let first_mock = first.mock_async(|when, then| {
        when.method(GET).path("/ping");
        then.status(200);
    }).await;
    let second_mock = second.mock_async(|when, then| {
        when.method(GET).path("/ping");
        then.status(200);
    }).await;

    let client = direct_client(&first);
    let clone = client.clone();

    client.system().ping().await.unwrap();
    client.set_target(EngineTarget::direct(&second.base_url()).unwrap());
    clone.system().ping().await.unwrap();

    first_mock.assert_calls_async(1).await;
    second_mock.assert_calls_async(1).await;
    assert_eq!(client.target().engine_url(), second.base_url());
}

#[tokio::test]
async fn test_switching_proxied_target_changes_header_only() {
    let proxy = MockServer::start_async().await;
    let base = format!("{}/api/engine", proxy.base_url());

    let a = proxy.mock_async(|when, then| {
        when.method(GET).path("/api/engine/rules").header("x-target-url", "http://a:9081");
        then.status(200).json_body(json!([]));
    }).await;
    let b = proxy.mock_async(|when, then| {
        when.method(GET).path("/api/engine/rules").header("x-target-url", "http://b:9081");
        then.status(200).json_body(json!([]));
    }).await;

    let client = EngineClient::new(ClientConfig::via_proxy(&base, "http://a:9081").unwrap()).unwrap();
    client.rules().list().await.unwrap();
    client.set_target(EngineTarget::proxied(&base, "http://b:9081").unwrap());
    client.rules().list().await.unwrap();

    a.assert_calls_async(1).await;
    b.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_timeout_is_distinct_error() {
    let server = MockServer::start_async().await;

    server.mock_async(|when, then| {
        when.method(GET).path("/rules");
        then.status(200).delay(Duration::from_secs(3)).json_body(json!([]));
    }).await;

    let config = ClientConfig::direct(&server.base_url())
        .unwrap()
        .timeout(Duration::from_millis(200));
    let client = EngineClient::new(config).unwrap();

    let started = Instant::now();
    let err = client.get("/rules").await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(!err.is_connection());
    assert!(started.elapsed() < Duration::from_secs(2));
    match err {
        ClientError::Timeout { url, timeout } => {
            assert!(url.ends_with("/rules"));
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_not_timeout() {
    let client = EngineClient::new(ClientConfig::direct("http://127.0.0.1:1").unwrap()).unwrap();

    let err = client.get("/ping").await.unwrap_err();

    assert!(err.is_connection(), "expected connection error, got {err:?}");
    assert!(!err.is_timeout());
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_bad_gateway_maps_to_upstream_unreachable() {
    let server = MockServer::start_async().await;

    server.mock_async(|when, then| {
        when.method(GET).path("/rules");
        then.status(502).json_body(json!({
            "error": "upstream_unreachable",
            "message": "connection refused"
        }));
    }).await;

    let err = direct_client(&server).get("/rules").await.unwrap_err();

    assert!(matches!(err, ClientError::UpstreamUnreachable(ref m) if m == "connection refused"));
    assert_eq!(err.http_status(), Some(StatusCode::BAD_GATEWAY));
}

#[tokio::test]
async fn test_error_envelope_and_raw_text() {
    let server = MockServer::start_async().await;

    server.mock_async(|when, then| {
        when.method(GET).path("/streams/missing");
        then.status(404)
            .json_body(json!({"error": 1002, "message": "stream missing not found"}));
    }).await;
    server.mock_async(|when, then| {
        when.method(DELETE).path("/rules/r1");
        then.status(500).body("internal failure");
    }).await;

    let client = direct_client(&server);

    let err = client.get("/streams/missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "stream missing not found");

    let err = client.rules().delete("r1").await.unwrap_err();
    match err {
        ClientError::Http { status, ref body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "internal failure");
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_empty_success_body_is_empty_object() {
    let server = MockServer::start_async().await;

    server.mock_async(|when, then| {
        when.method(POST).path("/rules/r1/stop");
        then.status(200);
    }).await;

    let value = direct_client(&server).rules().stop("r1").await.unwrap();
    assert_eq!(value, json!({}));
}
