//! Store-backed protocol tests against the in-memory fake, covering
//! scanner-only compensation and double-fire idempotence without requiring
//! a live Redis.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis_keyspace_watcher::config::{RawWatcherConfig, WatcherConfig};
use redis_keyspace_watcher::event::EventType;
use redis_keyspace_watcher::store::memory::MemoryStore;
use redis_keyspace_watcher::Watcher;

fn recording_config(scan_interval_secs: u64, grace_period_secs: u64) -> (WatcherConfig, Arc<Mutex<Vec<(EventType, String)>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let config = WatcherConfig::default()
        .with_callback(move |action, key| recorded.lock().unwrap().push((action, key)))
        .merge(RawWatcherConfig {
            scan_interval_secs: Some(scan_interval_secs),
            grace_period_secs: Some(grace_period_secs),
            ..Default::default()
        });
    (config, events)
}

#[tokio::test]
async fn scanner_compensates_a_key_the_live_stream_never_reports() {
    let store = MemoryStore::new();
    let (config, events) = recording_config(1, 0);
    let watcher = Arc::new(Watcher::new(store, config).await.unwrap());

    // Register with a TTL already in the past so the very first scan tick
    // finds it overdue; nothing is ever published on the live stream.
    watcher
        .register("stale-key", "payload", Duration::from_millis(1))
        .await
        .unwrap();

    let watch_handle = {
        let watcher = Arc::clone(&watcher);
        tokio::spawn(async move { watcher.watch().await })
    };

    tokio::time::sleep(Duration::from_millis(1500)).await;
    watcher.close().await;
    watch_handle.await.unwrap();

    let recorded = events.lock().unwrap();
    assert_eq!(*recorded, vec![(EventType::Expired, "stale-key".to_string())]);
    assert!(watcher.index().overdue(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn live_and_scanner_paths_both_firing_is_tolerated() {
    let store = MemoryStore::new();
    let (config, events) = recording_config(1, 0);
    let watcher = Arc::new(Watcher::new(store, config).await.unwrap());

    watcher
        .register("double-fire", "payload", Duration::from_millis(1))
        .await
        .unwrap();

    let watch_handle = {
        let watcher = Arc::clone(&watcher);
        tokio::spawn(async move { watcher.watch().await })
    };

    // Publish the live notification racing the scanner's first tick; both
    // may fire, but the second `index_remove` must be a harmless no-op.
    watcher
        .store()
        .publish("__keyevent@0__:expired", "double-fire");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    watcher.close().await;
    watch_handle.await.unwrap();

    let recorded = events.lock().unwrap();
    assert!(!recorded.is_empty());
    assert!(recorded
        .iter()
        .all(|(action, key)| *action == EventType::Expired && key == "double-fire"));
    assert!(watcher.index().overdue(0).await.unwrap().is_empty());
}
