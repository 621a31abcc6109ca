//! Health checks and the background monitor

use std::sync::Arc;
use std::time::Duration;

use rulestudio::health::HealthChecker;
use rulestudio::settings::{NewServer, ServerStatus, SettingsStore};
use rulestudio::test_support::MockEngine;

async fn store_with(dir: &std::path::Path, urls: &[(&str, String)]) -> Arc<SettingsStore> {
    let store = Arc::new(SettingsStore::open(dir.join("settings.json")).await.unwrap());
    for (name, url) in urls {
        store
            .add_server(NewServer {
                name: (*name).into(),
                url: url.clone(),
                description: None,
            })
            .await
            .unwrap();
    }
    store
}

#[tokio::test]
async fn check_all_updates_every_server() {
    let engine = MockEngine::start().await;
    let failing = httpmock::MockServer::start_async().await;
    failing
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET).path("/ping");
            then.status(500).body("internal failure");
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(
        dir.path(),
        &[
            ("up", engine.base_url()),
            ("down", "http://127.0.0.1:1".to_owned()),
            ("broken", failing.base_url()),
        ],
    )
    .await;

    let checker = HealthChecker::new(Arc::clone(&store)).with_ping_timeout(Duration::from_secs(1));
    let results = checker.check_all().await.unwrap();

    let status_of = |name: &str| {
        results
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
            .unwrap()
    };
    assert_eq!(status_of("up"), ServerStatus::Connected);
    assert_eq!(status_of("down"), ServerStatus::Disconnected);
    assert_eq!(status_of("broken"), ServerStatus::Error);
    assert!(results.iter().all(|s| s.last_checked.is_some()));
}

#[tokio::test]
async fn monitor_runs_until_stopped() {
    let engine = MockEngine::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(dir.path(), &[("up", engine.base_url())]).await;

    let monitor = Arc::new(HealthChecker::new(Arc::clone(&store)))
        .spawn_monitor(Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;
    monitor.stop().await;

    let pings = engine
        .recorded_requests()
        .await
        .iter()
        .filter(|r| r.uri == "/ping")
        .count();
    assert!(pings >= 2, "expected repeated pings, got {pings}");
    assert_eq!(store.list_servers().await[0].status, ServerStatus::Connected);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let after = engine.recorded_requests().await.len();
    assert_eq!(after, pings);
}
