//! Metrics poller and trace capture against a mocked engine

use std::time::Duration;

use httpmock::prelude::*;
use rulestudio_sdk::metrics::MetricsPoller;
use rulestudio_sdk::trace_capture::TraceCapture;
use rulestudio_sdk::{ClientConfig, EngineClient};
use serde_json::json;

async fn client_for(server: &MockServer) -> EngineClient {
    EngineClient::new(ClientConfig::direct(&server.base_url()).unwrap()).unwrap()
}

async fn mock_status(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rules/fast/status");
            then.status(200)
                .json_body(json!({"status": "running", "speed": "5.5"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rules/gone/status");
            then.status(404)
                .json_body(json!({"error": 1002, "message": "rule gone not found"}));
        })
        .await;
}

#[tokio::test]
async fn test_poll_once_skips_failing_rules() {
    let server = MockServer::start_async().await;
    mock_status(&server).await;

    let mut poller = MetricsPoller::new(
        client_for(&server).await,
        vec!["fast".into(), "gone".into()],
    );
    let sample = poller.poll_once().await;

    assert!((sample.total - 5.5).abs() < 1e-9);
    assert_eq!(sample.per_rule.len(), 1);
    assert!(sample.per_rule.contains_key("fast"));
}

#[tokio::test]
async fn test_poller_collects_bounded_window_until_stopped() {
    let server = MockServer::start_async().await;
    mock_status(&server).await;

    let handle = MetricsPoller::new(client_for(&server).await, vec!["fast".into()])
        .interval(Duration::from_millis(30))
        .capacity(3)
        .start();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(handle.latest().is_some());

    let samples = handle.stop().await;
    assert_eq!(samples.len(), 3);
    assert!(samples.windows(2).all(|w| w[0].at <= w[1].at));
    assert!(samples.iter().all(|s| s.total.is_finite() && s.total >= 0.0));
}

#[tokio::test]
async fn test_trace_capture_collects_unseen_traces_and_always_stops() {
    let server = MockServer::start_async().await;

    let start = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rules/r1/trace/start")
                .json_body(json!({"strategy": "always"}));
            then.status(200);
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/trace/rule/r1");
            then.status(200).json_body(json!(["t1", "t2"]));
        })
        .await;
    let t1 = server
        .mock_async(|when, then| {
            when.method(GET).path("/trace/t1");
            then.status(200).json_body(json!([{
                "Name": "source", "TraceID": "t1", "SpanID": "a",
                "ChildSpan": [{"Name": "sink", "TraceID": "t1", "SpanID": "b", "ParentSpanID": "a"}]
            }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/trace/t2");
            then.status(500).body("trace store unavailable");
        })
        .await;
    let stop = server
        .mock_async(|when, then| {
            when.method(POST).path("/rules/r1/trace/stop");
            then.status(200);
        })
        .await;

    let capture = TraceCapture::new(client_for(&server).await)
        .iterations(3)
        .interval(Duration::from_millis(10));
    let report = capture.run("r1").await.unwrap();

    assert_eq!(report.iterations, 3);
    assert_eq!(report.traces, 1);
    assert_eq!(report.spans, 2);
    assert_eq!(report.failed_polls, 3);
    assert_eq!(capture.spans("r1").len(), 2);

    start.assert_async().await;
    list.assert_calls_async(3).await;
    t1.assert_calls_async(1).await;
    stop.assert_async().await;

    capture.clear("r1");
    assert!(capture.spans("r1").is_empty());
}

#[tokio::test]
async fn test_trace_capture_fails_when_tracing_cannot_start() {
    let server = MockServer::start_async().await;
    let stop = server
        .mock_async(|when, then| {
            when.method(POST).path("/rules/r1/trace/stop");
            then.status(200);
        })
        .await;

    let capture = TraceCapture::new(client_for(&server).await).iterations(1);
    let err = capture.run("r1").await.unwrap_err();

    assert!(err.is_not_found());
    stop.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_zero_interval_is_raised_and_poller_keeps_sampling() {
    let server = MockServer::start_async().await;
    mock_status(&server).await;

    let handle = MetricsPoller::new(client_for(&server).await, vec!["fast".into()])
        .interval(Duration::ZERO)
        .start();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let samples = handle.stop().await;
    assert!(!samples.is_empty());
}

#[tokio::test]
async fn test_repeated_capture_does_not_duplicate_traces() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/rules/r1/trace/start");
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rules/r1/trace/stop");
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/trace/rule/r1");
            then.status(200).json_body(json!(["t1"]));
        })
        .await;
    let t1 = server
        .mock_async(|when, then| {
            when.method(GET).path("/trace/t1");
            then.status(200).json_body(json!([{
                "Name": "source", "TraceID": "t1", "SpanID": "a", "Attribute": {"data": "{}"},
                "ChildSpan": [{
                    "Name": "sink", "TraceID": "t1", "SpanID": "b", "ParentSpanID": "a",
                    "Attribute": null, "ChildSpan": null
                }]
            }]));
        })
        .await;

    let capture = TraceCapture::new(client_for(&server).await)
        .iterations(2)
        .interval(Duration::from_millis(10));

    let first = capture.run("r1").await.unwrap();
    assert_eq!(first.traces, 1);
    assert_eq!(first.spans, 2);
    assert_eq!(first.failed_polls, 0);

    let second = capture.run("r1").await.unwrap();
    assert_eq!(second.traces, 0);
    assert_eq!(capture.spans("r1").len(), 2);
    t1.assert_calls_async(1).await;

    capture.clear("r1");
    let third = capture.run("r1").await.unwrap();
    assert_eq!(third.traces, 1);
    assert_eq!(capture.spans("r1").len(), 2);
}
