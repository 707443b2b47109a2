//! Runnable demo: registers a few keys with short TTLs against a local Redis
//! and prints every observed expiry/delete/set event as it's reported.

use std::time::Duration;

use rand::Rng;
use redis_keyspace_watcher::config::WatcherConfig;
use redis_keyspace_watcher::store::redis::RedisStore;
use redis_keyspace_watcher::util::init_tracing;
use redis_keyspace_watcher::Watcher;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let redis_url =
        std::env::var("WATCHER_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());
    let store = RedisStore::connect(&redis_url).await?;

    let config = WatcherConfig::load(None)?.with_callback(|action, key| {
        println!("{action:?} {key}");
    });

    let watcher = Watcher::new(store, config).await?;
    let watcher = std::sync::Arc::new(watcher);

    let watch_handle = {
        let watcher = std::sync::Arc::clone(&watcher);
        tokio::spawn(async move { watcher.watch().await })
    };

    info!("waiting for key events, registering a handful of short-lived demo keys");
    for i in 0..5 {
        let key = format!("demo:session:{i}");
        let ttl_secs = rand::rng().random_range(2..=6);
        watcher
            .register(&key, "demo-payload", Duration::from_secs(ttl_secs))
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    watcher.close().await;
    watch_handle.await?;

    Ok(())
}
