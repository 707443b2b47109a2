//! Sharded Redis backend: fans a single logical store out across several
//! [`RedisStore`] nodes, routing writes by a caller-supplied shard function
//! and subscribing on every shard at once.

use std::time::Duration;

use async_trait::async_trait;

use super::redis::RedisStore;
use super::{NotificationStream, StoreAdapter, StoreError};

/// Picks a shard index in `[0, shard_count)` for a given key.
pub trait ShardFn: Fn(&str, usize) -> usize + Send + Sync + 'static {}

impl<F> ShardFn for F where F: Fn(&str, usize) -> usize + Send + Sync + 'static {}

/// Deterministic default: sums the key's bytes and reduces modulo the shard
/// count. Stable across process restarts, unlike a hasher seeded per-run.
#[must_use]
pub fn default_shard_fn(key: &str, shard_count: usize) -> usize {
    let sum = key.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize));
    sum % shard_count.max(1)
}

/// A [`StoreAdapter`] that routes reads and writes across multiple
/// independent Redis nodes by key, and subscribes on every shard.
pub struct ShardedRedisStore {
    shards: Vec<RedisStore>,
    shard_fn: Box<dyn ShardFn>,
}

impl ShardedRedisStore {
    /// Build a sharded store over already-connected nodes, using
    /// [`default_shard_fn`] for routing.
    #[must_use]
    pub fn new(shards: Vec<RedisStore>) -> Self {
        Self::with_shard_fn(shards, default_shard_fn)
    }

    /// Build a sharded store with a custom routing function.
    #[must_use]
    pub fn with_shard_fn<F>(shards: Vec<RedisStore>, shard_fn: F) -> Self
    where
        F: ShardFn,
    {
        assert!(!shards.is_empty(), "sharded store requires at least one shard");
        Self {
            shards,
            shard_fn: Box::new(shard_fn),
        }
    }

    fn shard_for(&self, key: &str) -> &RedisStore {
        let index = (self.shard_fn)(key, self.shards.len());
        &self.shards[index % self.shards.len()]
    }
}

#[async_trait]
impl StoreAdapter for ShardedRedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.shard_for(key).set(key, value, ttl).await
    }

    async fn index_add(&self, index_key: &str, member: &str, score: i64) -> Result<(), StoreError> {
        self.shard_for(member)
            .index_add(index_key, member, score)
            .await
    }

    async fn index_range_by_score(
        &self,
        index_key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError> {
        let mut combined = Vec::new();
        for shard in &self.shards {
            combined.extend(shard.index_range_by_score(index_key, min, max).await?);
        }
        Ok(combined)
    }

    async fn index_remove(&self, index_key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut grouped: Vec<Vec<String>> = vec![Vec::new(); self.shards.len()];
        for member in members {
            let index = (self.shard_fn)(member, self.shards.len()) % self.shards.len();
            grouped[index].push(member.clone());
        }
        let mut removed = 0;
        for (shard, members) in self.shards.iter().zip(grouped) {
            if members.is_empty() {
                continue;
            }
            removed += shard.index_remove(index_key, &members).await?;
        }
        Ok(removed)
    }

    async fn subscribe(
        &self,
        patterns: &[String],
    ) -> Result<Vec<Box<dyn NotificationStream>>, StoreError> {
        let mut streams = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            streams.extend(shard.subscribe(patterns).await?);
        }
        Ok(streams)
    }

    async fn fuse_set_and_index(
        &self,
        index_key: &str,
        key: &str,
        value: &str,
        ttl: Duration,
        score: i64,
    ) -> Result<(), StoreError> {
        self.shard_for(key)
            .fuse_set_and_index(index_key, key, value, ttl, score)
            .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        for shard in &self.shards {
            shard.close().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shard_fn_is_stable_across_calls() {
        assert_eq!(default_shard_fn("user:42", 4), default_shard_fn("user:42", 4));
    }

    #[test]
    fn default_shard_fn_stays_in_range() {
        for key in ["a", "bb", "ccc", "job:delayed:99"] {
            assert!(default_shard_fn(key, 3) < 3);
        }
    }
}
