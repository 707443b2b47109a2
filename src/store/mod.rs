//! Store adapter trait and its implementations.
//!
//! A uniform capability surface over single-node vs. sharded stores: a
//! TTL'd set, a sorted-set delayed-key index (add/range/remove), and
//! pattern-based subscribe with per-shard fan-out.

pub mod memory;
pub mod redis;
pub mod sharded;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a [`StoreAdapter`]. Always transient from the
/// watcher's point of view: the caller logs and retries on the next
/// tick/loop rather than treating any of these as fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying Redis client reported an error.
    #[error("store backend error: {0}")]
    Backend(String),
    /// A subscription stream's `receive` call failed or the stream closed.
    #[error("subscription lost: {0}")]
    SubscriptionLost(String),
}

/// A single message delivered on a subscription stream.
#[derive(Debug, Clone)]
pub struct Message {
    /// The channel the message was published on (pattern-matched).
    pub channel: String,
    /// The message payload — for keyspace notifications, the affected key.
    pub payload: String,
}

/// A live, per-shard notification stream.
///
/// Implementations serialize `receive` internally: callers may share one
/// stream across several workers (e.g. behind a mutex) without corrupting
/// message order.
#[async_trait]
pub trait NotificationStream: Send {
    /// Block (asynchronously) until the next message arrives.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SubscriptionLost`] if the underlying
    /// connection failed; the caller is expected to log and retry on the
    /// next loop iteration rather than treat this as fatal.
    async fn receive(&mut self) -> Result<Message, StoreError>;

    /// Release the underlying connection, unblocking any in-flight
    /// `receive` call with an error.
    async fn close(&mut self);
}

/// Capability surface abstracting over single-node and sharded stores.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Write `key` with `value`, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any backend failure.
    async fn set(&self, key: &str, value: &str, ttl: std::time::Duration) -> Result<(), StoreError>;

    /// Insert `(member, score)` into the delayed-key index named
    /// `index_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any backend failure.
    async fn index_add(&self, index_key: &str, member: &str, score: i64) -> Result<(), StoreError>;

    /// Return members of the `index_key` index whose score falls in
    /// `[min, max]`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any backend failure.
    async fn index_range_by_score(
        &self,
        index_key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError>;

    /// Remove entries by member name from the `index_key` index. Removing an
    /// absent member is a no-op, not an error. Returns the number of entries
    /// actually removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any backend failure.
    async fn index_remove(&self, index_key: &str, members: &[String]) -> Result<u64, StoreError>;

    /// Subscribe to `patterns` across every shard, returning one stream per
    /// shard (length 1 for a single-node store).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if any shard fails to subscribe.
    async fn subscribe(
        &self,
        patterns: &[String],
    ) -> Result<Vec<Box<dyn NotificationStream>>, StoreError>;

    /// Perform `set` and `index_add` as a single atomic operation where the
    /// backend supports it. The default implementation falls back to two
    /// sequential calls and accepts the resulting window of inconsistency
    /// (see the crate-level docs on at-least-once delivery).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any backend failure, propagating
    /// whichever of the two underlying calls failed first.
    async fn fuse_set_and_index(
        &self,
        index_key: &str,
        key: &str,
        value: &str,
        ttl: std::time::Duration,
        score: i64,
    ) -> Result<(), StoreError> {
        self.set(key, value, ttl).await?;
        self.index_add(index_key, key, score).await
    }

    /// Release underlying resources.
    async fn close(&self) -> Result<(), StoreError>;
}
