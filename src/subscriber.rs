//! Live subscriber: one [`Job`] per shard stream, each running `job_size`
//! workers that share a single [`NotificationStream`] behind a lock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::WatcherConfig;
use crate::core::job::TaskFactory;
use crate::core::Job;
use crate::event::EventType;
use crate::index::DelayedKeyIndex;
use crate::store::{NotificationStream, StoreAdapter};

type SharedStream = Arc<AsyncMutex<Box<dyn NotificationStream>>>;

struct SubscriberTask<S: StoreAdapter> {
    stream: SharedStream,
    index: Arc<DelayedKeyIndex<S>>,
    config: WatcherConfig,
    cancel: CancellationToken,
}

impl<S: StoreAdapter> TaskFactory for SubscriberTask<S> {
    type Fut = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn call(&self) -> Self::Fut {
        let stream = Arc::clone(&self.stream);
        let index = Arc::clone(&self.index);
        let config = self.config.clone();
        let cancel = self.cancel.clone();
        Box::pin(async move {
            let mut guard = stream.lock().await;
            let message = tokio::select! {
                () = cancel.cancelled() => return,
                result = guard.receive() => result,
            };
            drop(guard);

            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    warn!(%err, "subscriber stream receive failed, retrying");
                    return;
                }
            };

            let prefix = config.channel_prefix();
            let event_type = message
                .channel
                .strip_prefix(prefix.as_str())
                .unwrap_or(message.channel.as_str());
            let action = EventType::parse(event_type);
            let key = message.payload;
            (config.callback)(action, key.clone());

            if let Err(err) = index.clear(std::slice::from_ref(&key)).await {
                warn!(%err, key, "failed to clear delayed-key index after live notification");
            }
        })
    }
}

/// Runs one worker pool per shard stream, feeding callbacks from live
/// keyspace notifications.
pub struct Subscriber<S: StoreAdapter> {
    streams: Vec<SharedStream>,
    jobs: Vec<Job<SubscriberTask<S>>>,
}

impl<S: StoreAdapter> Subscriber<S> {
    /// Build a subscriber over one [`NotificationStream`] per shard.
    pub fn new(
        raw_streams: Vec<Box<dyn NotificationStream>>,
        index: Arc<DelayedKeyIndex<S>>,
        config: WatcherConfig,
        cancel: CancellationToken,
    ) -> Self {
        let streams: Vec<SharedStream> = raw_streams
            .into_iter()
            .map(|stream| Arc::new(AsyncMutex::new(stream)))
            .collect();
        let jobs = streams
            .iter()
            .map(|stream| {
                let task = SubscriberTask {
                    stream: Arc::clone(stream),
                    index: Arc::clone(&index),
                    config: config.clone(),
                    cancel: cancel.clone(),
                };
                Job::new(task, config.job_size, None, false)
            })
            .collect();
        Self { streams, jobs }
    }

    /// Run every shard's worker pool until [`Self::close`] is called.
    /// Resolves once all shards have fully drained.
    pub async fn run(&self) {
        let runs = self.jobs.iter().map(Job::run);
        futures_util::future::join_all(runs).await;
    }

    /// Stop accepting new messages and drain every shard's workers.
    ///
    /// Closes each underlying stream first so any worker currently blocked
    /// in `receive` unblocks immediately, then signals and waits for each
    /// shard's pool to drain.
    pub async fn close(&self) {
        for stream in &self.streams {
            stream.lock().await.close().await;
        }
        for job in &self.jobs {
            job.close().await;
        }
    }
}
