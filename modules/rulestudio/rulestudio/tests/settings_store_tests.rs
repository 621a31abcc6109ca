//! Settings file persistence

use std::sync::Arc;

use chrono::Utc;
use rulestudio::ConsoleError;
use rulestudio::settings::{
    MAX_ACTIVITY_ENTRIES, NewQuery, NewServer, ServerStatus, SettingsStore, SettingsUpdate, Theme,
};

fn server(name: &str, url: &str) -> NewServer {
    NewServer {
        name: name.into(),
        url: url.into(),
        description: None,
    }
}

#[tokio::test]
async fn missing_file_starts_empty_and_is_created_on_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let store = SettingsStore::open(&path).await.unwrap();
    assert!(store.list_servers().await.is_empty());
    assert!(!path.exists());

    store.add_server(server("edge", "http://e:9081")).await.unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let store = SettingsStore::open(&path).await.unwrap();
    let edge = store.add_server(server("edge", "http://e:9081")).await.unwrap();
    store
        .set_server_status(&edge.id, ServerStatus::Connected, Utc::now())
        .await
        .unwrap();
    store
        .add_query(NewQuery {
            name: "all".into(),
            sql: "SELECT * FROM demo".into(),
        })
        .await
        .unwrap();
    store
        .update_settings(SettingsUpdate {
            theme: Some(Theme::Light),
            ..SettingsUpdate::default()
        })
        .await
        .unwrap();
    drop(store);

    let reopened = SettingsStore::open(&path).await.unwrap();
    let servers = reopened.list_servers().await;
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].status, ServerStatus::Connected);
    assert!(servers[0].last_checked.is_some());
    assert_eq!(reopened.list_queries().await[0].name, "all");
    assert_eq!(reopened.settings().await.theme, Theme::Light);
    assert_eq!(reopened.active_server().await.map(|s| s.id), Some(edge.id));
}

#[tokio::test]
async fn unknown_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"version": 99, "servers": []}"#).unwrap();

    let err = SettingsStore::open(&path).await.err().unwrap();
    assert!(matches!(err, ConsoleError::Storage(ref m) if m.contains("version 99")));
}

#[tokio::test]
async fn malformed_file_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(
        SettingsStore::open(&path).await,
        Err(ConsoleError::Storage(_))
    ));
}

#[tokio::test]
async fn changing_url_resets_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json"))
        .await
        .unwrap();

    let edge = store.add_server(server("edge", "http://e:9081")).await.unwrap();
    store
        .set_server_status(&edge.id, ServerStatus::Error, Utc::now())
        .await
        .unwrap();

    let moved = store
        .update_server(
            &edge.id,
            rulestudio::settings::ServerUpdate {
                url: Some("http://e2:9081".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.url, "http://e2:9081");
    assert_eq!(moved.status, ServerStatus::Unknown);
    assert!(moved.last_checked.is_none());
}

#[tokio::test]
async fn failed_mutation_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json"))
        .await
        .unwrap();
    store.add_server(server("a", "http://a:9081")).await.unwrap();
    let before = store.snapshot().await;

    assert!(matches!(
        store.add_server(server("b", "http://a:9081/")).await,
        Err(ConsoleError::Conflict(_))
    ));
    assert!(matches!(
        store.remove_query("missing").await,
        Err(ConsoleError::NotFound { .. })
    ));

    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn concurrent_mutations_are_serialised() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = Arc::new(SettingsStore::open(&path).await.unwrap());

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .append_activity("test", &format!("item-{i}"), None)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let reopened = SettingsStore::open(&path).await.unwrap();
    assert_eq!(reopened.recent_activity(None).await.len(), 20);
}

#[tokio::test]
async fn activity_log_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json"))
        .await
        .unwrap();

    for i in 0..(MAX_ACTIVITY_ENTRIES + 3) {
        store
            .append_activity("test", &i.to_string(), None)
            .await
            .unwrap();
    }

    let recent = store.recent_activity(None).await;
    assert_eq!(recent.len(), MAX_ACTIVITY_ENTRIES);
    assert_eq!(recent[0].target, (MAX_ACTIVITY_ENTRIES + 2).to_string());
}
