//! Delayed-key index: a sorted-set view over a [`StoreAdapter`] tracking
//! when each registered key is expected to expire.

use std::sync::Arc;

use crate::store::{StoreAdapter, StoreError};
use crate::util::now_ms;

/// Tracks registered keys by their expected expiry time, backing the
/// compensation scanner's ability to find keys the live subscriber missed.
pub struct DelayedKeyIndex<S: StoreAdapter> {
    store: Arc<S>,
    queue_key: String,
}

impl<S: StoreAdapter> DelayedKeyIndex<S> {
    /// Wrap a store adapter, storing under the sorted set named `queue_key`.
    pub fn new(store: Arc<S>, queue_key: String) -> Self {
        Self { store, queue_key }
    }

    /// Record that `key` is expected to expire at `expiry_ms` (Unix millis).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any backend failure.
    pub async fn track(&self, key: &str, expiry_ms: i64) -> Result<(), StoreError> {
        self.store.index_add(&self.queue_key, key, expiry_ms).await
    }

    /// Keys whose expected expiry is at or before `now_ms() - grace_ms`,
    /// i.e. keys the live subscriber should already have reported but
    /// hasn't — candidates for compensation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any backend failure.
    pub async fn overdue(&self, grace_ms: i64) -> Result<Vec<String>, StoreError> {
        let cutoff = now_ms().saturating_sub(grace_ms);
        self.store
            .index_range_by_score(&self.queue_key, i64::MIN, cutoff)
            .await
    }

    /// Remove `keys` from the index, e.g. after they've been reported by
    /// either the live subscriber or the scanner. Removing an absent key is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any backend failure.
    pub async fn clear(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.store.index_remove(&self.queue_key, keys).await
    }

    /// Write `key`/`value` (expiring after `ttl`) and track its expiry in
    /// one call, using the backend's atomic fused path where available.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any backend failure.
    pub async fn fuse_set_and_index(
        &self,
        key: &str,
        value: &str,
        ttl: std::time::Duration,
        expiry_ms: i64,
    ) -> Result<(), StoreError> {
        self.store
            .fuse_set_and_index(&self.queue_key, key, value, ttl, expiry_ms)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn overdue_respects_grace_window() {
        let store = Arc::new(MemoryStore::new());
        let index = DelayedKeyIndex::new(Arc::clone(&store), "job:delayed".to_string());
        let now = now_ms();
        index.track("fresh", now + 60_000).await.unwrap();
        index.track("stale", now - 60_000).await.unwrap();

        let overdue = index.overdue(10_000).await.unwrap();
        assert_eq!(overdue, vec!["stale".to_string()]);
    }

    #[tokio::test]
    async fn clear_removes_tracked_keys() {
        let store = Arc::new(MemoryStore::new());
        let index = DelayedKeyIndex::new(Arc::clone(&store), "job:delayed".to_string());
        index.track("k1", now_ms() - 1).await.unwrap();
        let removed = index.clear(&["k1".to_string()]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(index.overdue(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn distinct_queue_keys_do_not_cross_contaminate() {
        let store = Arc::new(MemoryStore::new());
        let index_a = DelayedKeyIndex::new(Arc::clone(&store), "queue:a".to_string());
        let index_b = DelayedKeyIndex::new(Arc::clone(&store), "queue:b".to_string());

        index_a.track("k1", now_ms() - 1).await.unwrap();

        assert_eq!(index_a.overdue(0).await.unwrap(), vec!["k1".to_string()]);
        assert!(index_b.overdue(0).await.unwrap().is_empty());
    }
}
