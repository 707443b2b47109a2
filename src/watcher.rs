//! Public entry point: wires a [`StoreAdapter`] to a live subscriber and a
//! compensation scanner behind one `register`/`watch`/`close` surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::WatcherConfig;
use crate::index::DelayedKeyIndex;
use crate::scanner::Scanner;
use crate::store::{StoreAdapter, StoreError};
use crate::subscriber::Subscriber;
use crate::util::now_ms;

/// Errors surfaced by the watcher's public operations.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// [`Watcher::register`] was called after [`Watcher::close`] started.
    #[error("watcher is closing, no longer accepting registrations")]
    Closing,
}

/// Ties a [`StoreAdapter`] to a live pub/sub subscriber and a periodic
/// compensation scanner so every registered key is reported exactly once,
/// at least once — even if the live notification is dropped.
pub struct Watcher<S: StoreAdapter> {
    store: Arc<S>,
    index: Arc<DelayedKeyIndex<S>>,
    subscriber: Subscriber<S>,
    scanner: Scanner<S>,
    closing: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl<S: StoreAdapter> Watcher<S> {
    /// Build a watcher over `store`, subscribing to `config.channel_pattern`
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Store`] if the initial subscribe fails.
    pub async fn new(store: S, config: WatcherConfig) -> Result<Self, WatcherError> {
        let store = Arc::new(store);
        let index = Arc::new(DelayedKeyIndex::new(Arc::clone(&store), config.queue_key.clone()));
        let cancel = CancellationToken::new();

        let patterns = vec![config.channel_pattern.clone()];
        let streams = store.subscribe(&patterns).await?;

        let subscriber = Subscriber::new(streams, Arc::clone(&index), config.clone(), cancel.clone());
        let scanner = Scanner::new(Arc::clone(&index), config);

        Ok(Self {
            store,
            index,
            subscriber,
            scanner,
            closing: Arc::new(AtomicBool::new(false)),
            cancel,
        })
    }

    /// Register `key` with `value`, expiring after `ttl`, and track it in
    /// the delayed-key index so the scanner can find it if the live
    /// subscriber misses the corresponding notification.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Closing`] if called after [`Self::close`] has
    /// started, or [`WatcherError::Store`] on a backend failure.
    pub async fn register(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WatcherError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(WatcherError::Closing);
        }
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let expiry_ms = now_ms() + ttl.as_millis() as i64;
        self.index.fuse_set_and_index(key, value, ttl, expiry_ms).await?;
        Ok(())
    }

    /// Run the subscriber and the scanner until [`Self::close`] is called.
    /// Resolves once both have fully drained.
    pub async fn watch(&self) {
        tokio::join!(self.subscriber.run(), self.scanner.run());
    }

    /// Stop accepting registrations and shut down cleanly: cancel the live
    /// subscriber's in-flight receives, drain the scanner, then drain the
    /// subscriber, then release the store.
    pub async fn close(&self) {
        self.closing.store(true, Ordering::Release);
        self.cancel.cancel();
        self.scanner.close().await;
        self.subscriber.close().await;
        let _ = self.store.close().await;
    }

    /// Direct access to the delayed-key index, mainly for tests asserting
    /// on its contents without going through the store directly.
    #[must_use]
    pub fn index(&self) -> &DelayedKeyIndex<S> {
        &self.index
    }

    /// Direct access to the backing store adapter.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
