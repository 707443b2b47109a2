//! In-memory [`StoreAdapter`] fake used by unit tests that need deterministic
//! behavior without a live Redis instance.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Message, NotificationStream, StoreAdapter, StoreError};

struct Inner {
    values: BTreeMap<String, String>,
    indices: BTreeMap<String, BTreeMap<String, i64>>,
}

/// An in-memory store. `set` and `index_add`/`index_remove` operate on plain
/// maps guarded by a single lock, namespaced by the caller-supplied
/// `index_key` so distinct queues don't collide; `subscribe` returns streams
/// fed by [`MemoryStore::publish`], so tests can simulate keyspace
/// notifications without a real pub/sub connection.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Build an empty store with no active subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                values: BTreeMap::new(),
                indices: BTreeMap::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Deliver `message` to every outstanding subscriber stream, simulating
    /// a keyspace notification. Subscribers whose receiver has dropped are
    /// pruned silently.
    pub fn publish(&self, channel: &str, payload: &str) {
        let message = Message {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }

    /// Snapshot of `index_key`'s current members, for assertions.
    #[must_use]
    pub fn index_members(&self, index_key: &str) -> Vec<String> {
        self.inner
            .lock()
            .indices
            .get(index_key)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The current value of `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().values.get(key).cloned()
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), StoreError> {
        self.inner
            .lock()
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn index_add(&self, index_key: &str, member: &str, score: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .indices
            .entry(index_key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn index_range_by_score(
        &self,
        index_key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .indices
            .get(index_key)
            .into_iter()
            .flatten()
            .filter(|(_, &score)| score >= min && score <= max)
            .map(|(member, _)| member.clone())
            .collect())
    }

    async fn index_remove(&self, index_key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let Some(index) = inner.indices.get_mut(index_key) else {
            return Ok(0);
        };
        let mut removed = 0;
        for member in members {
            if index.remove(member).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn subscribe(
        &self,
        _patterns: &[String],
    ) -> Result<Vec<Box<dyn NotificationStream>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Ok(vec![Box::new(MemoryNotificationStream { rx })])
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.subscribers.lock().clear();
        Ok(())
    }
}

struct MemoryNotificationStream {
    rx: mpsc::UnboundedReceiver<Message>,
}

#[async_trait]
impl NotificationStream for MemoryNotificationStream {
    async fn receive(&mut self) -> Result<Message, StoreError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| StoreError::SubscriptionLost("publisher dropped".to_string()))
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_index_round_trip() {
        let store = MemoryStore::new();
        store.set("k1", "v1", Duration::from_secs(1)).await.unwrap();
        store.index_add("job:delayed", "k1", 1000).await.unwrap();
        assert_eq!(store.get("k1").as_deref(), Some("v1"));
        let members = store
            .index_range_by_score("job:delayed", 0, 2000)
            .await
            .unwrap();
        assert_eq!(members, vec!["k1".to_string()]);
        let removed = store
            .index_remove("job:delayed", &["k1".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.index_members("job:delayed").is_empty());
    }

    #[tokio::test]
    async fn distinct_index_keys_do_not_collide() {
        let store = MemoryStore::new();
        store.index_add("queue:a", "k1", 1000).await.unwrap();
        store.index_add("queue:b", "k1", 2000).await.unwrap();

        assert_eq!(store.index_members("queue:a"), vec!["k1".to_string()]);
        assert_eq!(store.index_members("queue:b"), vec!["k1".to_string()]);

        let removed = store
            .index_remove("queue:a", &["k1".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.index_members("queue:a").is_empty());
        assert_eq!(store.index_members("queue:b"), vec!["k1".to_string()]);
    }

    #[tokio::test]
    async fn publish_reaches_active_subscriber() {
        let store = MemoryStore::new();
        let mut streams = store.subscribe(&["__keyevent@0__:*".to_string()]).await.unwrap();
        let mut stream = streams.remove(0);
        store.publish("__keyevent@0__:expired", "k1");
        let message = stream.receive().await.unwrap();
        assert_eq!(message.channel, "__keyevent@0__:expired");
        assert_eq!(message.payload, "k1");
    }

    #[tokio::test]
    async fn closed_stream_surfaces_subscription_lost() {
        let store = MemoryStore::new();
        let mut streams = store.subscribe(&["*".to_string()]).await.unwrap();
        let mut stream = streams.remove(0);
        stream.close().await;
        assert!(stream.receive().await.is_err());
    }
}
