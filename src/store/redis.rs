//! Single-node Redis backend for [`StoreAdapter`].
//!
//! Uses a multiplexed [`redis::aio::ConnectionManager`] for commands and a
//! dedicated [`redis::aio::PubSub`] connection per [`RedisStore::subscribe`]
//! call, since a pub/sub connection can't also issue regular commands.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tracing::warn;

use super::{Message, NotificationStream, StoreAdapter, StoreError};

fn backend_err(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// A [`StoreAdapter`] backed by a single Redis (or Redis-compatible) node.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`), establishing the
    /// multiplexed command connection eagerly.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the URL is malformed or the
    /// initial connection attempt fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(backend_err)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(backend_err)?;
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl StoreAdapter for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(backend_err)
    }

    async fn index_add(&self, index_key: &str, member: &str, score: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(index_key, member, score)
            .await
            .map_err(backend_err)
    }

    async fn index_range_by_score(
        &self,
        index_key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.zrangebyscore(index_key, min, max)
            .await
            .map_err(backend_err)
    }

    async fn index_remove(&self, index_key: &str, members: &[String]) -> Result<u64, StoreError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.zrem(index_key, members).await.map_err(backend_err)
    }

    async fn subscribe(
        &self,
        patterns: &[String],
    ) -> Result<Vec<Box<dyn NotificationStream>>, StoreError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(backend_err)?;
        for pattern in patterns {
            pubsub.psubscribe(pattern).await.map_err(backend_err)?;
        }
        Ok(vec![Box::new(RedisNotificationStream::new(pubsub))])
    }

    async fn fuse_set_and_index(
        &self,
        index_key: &str,
        key: &str,
        value: &str,
        ttl: Duration,
        score: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        fuse_script()
            .key(key)
            .key(index_key)
            .arg(value)
            .arg(seconds)
            .arg(score)
            .invoke_async::<()>(&mut conn)
            .await
            .map_err(backend_err)
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

const FUSE_SCRIPT_SOURCE: &str = r"
redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
redis.call('ZADD', KEYS[2], ARGV[3], KEYS[1])
return 1
";

fn fuse_script() -> &'static redis::Script {
    static SCRIPT: std::sync::OnceLock<redis::Script> = std::sync::OnceLock::new();
    SCRIPT.get_or_init(|| redis::Script::new(FUSE_SCRIPT_SOURCE))
}

struct RedisNotificationStream {
    pubsub: PubSub,
}

impl RedisNotificationStream {
    fn new(pubsub: PubSub) -> Self {
        Self { pubsub }
    }
}

#[async_trait]
impl NotificationStream for RedisNotificationStream {
    async fn receive(&mut self) -> Result<Message, StoreError> {
        let mut stream = self.pubsub.on_message();
        match stream.next().await {
            Some(msg) => {
                let channel = msg.get_channel_name().to_string();
                let payload: String = msg.get_payload().map_err(backend_err)?;
                Ok(Message { channel, payload })
            }
            None => {
                warn!("redis pubsub stream ended");
                Err(StoreError::SubscriptionLost(
                    "pubsub connection closed".to_string(),
                ))
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.pubsub.punsubscribe("*").await;
    }
}
