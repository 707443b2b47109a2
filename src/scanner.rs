//! Compensation scanner: a single periodic worker that finds keys the live
//! subscriber should have reported by now but hasn't, and reports them
//! directly so at-least-once delivery holds even through a missed or
//! dropped pub/sub message.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::WatcherConfig;
use crate::core::job::TaskFactory;
use crate::core::Job;
use crate::event::EventType;
use crate::index::DelayedKeyIndex;
use crate::store::StoreAdapter;

struct ScannerTask<S: StoreAdapter> {
    index: Arc<DelayedKeyIndex<S>>,
    config: WatcherConfig,
}

impl<S: StoreAdapter> TaskFactory for ScannerTask<S> {
    type Fut = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn call(&self) -> Self::Fut {
        let index = Arc::clone(&self.index);
        let config = self.config.clone();
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            let grace_ms = config.grace_period.as_millis() as i64;
            let overdue = match index.overdue(grace_ms).await {
                Ok(keys) => keys,
                Err(err) => {
                    warn!(%err, "compensation scan failed");
                    return;
                }
            };
            if overdue.is_empty() {
                return;
            }
            for key in &overdue {
                (config.callback)(EventType::Expired, key.clone());
            }
            if let Err(err) = index.clear(&overdue).await {
                error!(%err, count = overdue.len(), "failed to clear index after compensation scan");
            }
        })
    }
}

/// A single-worker, interval-paced job that runs the compensation scan.
pub struct Scanner<S: StoreAdapter> {
    job: Job<ScannerTask<S>>,
}

impl<S: StoreAdapter> Scanner<S> {
    /// Build a scanner ticking at `config.scan_interval`.
    ///
    /// Runs with `auto_recover = true`: a scan that panics (e.g. on a
    /// backend bug) is logged and retried on the next tick rather than
    /// aborting the process, since a missed scan is recoverable — the next
    /// tick re-observes the same overdue keys.
    #[must_use]
    pub fn new(index: Arc<DelayedKeyIndex<S>>, config: WatcherConfig) -> Self {
        let interval = config.scan_interval;
        let task = ScannerTask { index, config };
        Self {
            job: Job::new(task, 1, Some(interval), true),
        }
    }

    /// Run the scan loop until [`Self::close`] is called.
    pub async fn run(&self) {
        self.job.run().await;
    }

    /// Stop ticking and wait for any in-flight scan to finish.
    pub async fn close(&self) {
        self.job.close().await;
    }
}
