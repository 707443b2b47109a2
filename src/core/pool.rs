//! Bounded-concurrency async task pool with graceful shutdown.
//!
//! # Design
//!
//! - **Backpressure, not rejection**: `submit` awaits a semaphore permit, so
//!   the caller is suspended while `size` tasks are already running instead
//!   of failing.
//! - **Single mutex for the closed/pending pair**: the pending counter is
//!   incremented before the permit is requested, so `close` can never miss a
//!   just-submitted task.
//! - **Two failure policies**: `auto_recover = true` catches and logs a task
//!   panic; `auto_recover = false` aborts the process, on the theory that a
//!   panic on that path is a protocol bug that must not be silently
//!   swallowed.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tracing::{error, warn};

use super::error::PoolError;

struct PoolState {
    closed: bool,
    pending: u64,
}

struct Inner {
    semaphore: Arc<Semaphore>,
    state: Mutex<PoolState>,
    drained: Notify,
    auto_recover: bool,
}

/// A bounded-concurrency executor of short-lived async tasks.
///
/// Cloning a `Pool` is cheap; every clone shares the same capacity, pending
/// counter, and closed flag.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

impl Pool {
    /// Create a pool with the given worker capacity.
    ///
    /// `auto_recover` controls what happens when a submitted task panics:
    /// `true` logs and continues, `false` aborts the process.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn new(size: usize, auto_recover: bool) -> Self {
        assert!(size > 0, "pool size must be at least 1");
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(size)),
                state: Mutex::new(PoolState {
                    closed: false,
                    pending: 0,
                }),
                drained: Notify::new(),
                auto_recover,
            }),
        }
    }

    /// Submit a task for execution.
    ///
    /// Suspends the caller while `size` tasks are already running. Returns
    /// [`PoolError::Closed`] if the pool has already been closed.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Closed` if `close()` has already been called.
    pub async fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.pending += 1;
        }

        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .expect("pool semaphore is never explicitly closed");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = tokio::spawn(task).await;
            inner.release(outcome);
        });

        Ok(())
    }

    /// Close the pool: reject further submissions and wait for every
    /// in-flight task to finish.
    ///
    /// Idempotent — calling `close` on an already-closed pool simply waits
    /// for drain (which may already be complete).
    pub async fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            state.closed = true;
        }
        self.inner.wait_drained().await;
    }
}

impl Inner {
    fn release(self: Arc<Self>, outcome: Result<(), tokio::task::JoinError>) {
        match outcome {
            Ok(()) => {}
            Err(join_err) if join_err.is_panic() => {
                if self.auto_recover {
                    warn!(error = %join_err, "pool task panicked; recovered");
                } else {
                    error!(error = %join_err, "pool task panicked with auto_recover=false; aborting");
                    std::process::abort();
                }
            }
            Err(join_err) => {
                warn!(error = %join_err, "pool task join error");
            }
        }

        let mut state = self.state.lock();
        state.pending -= 1;
        if state.pending == 0 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.lock().pending == 0 {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn pool_throughput() {
        let pool = Pool::new(2, false);
        let executed = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        for _ in 0..5 {
            let executed = Arc::clone(&executed);
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                executed.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        pool.close().await;
        assert_eq!(executed.load(Ordering::SeqCst), 5);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn panic_isolation_with_auto_recover() {
        let pool = Pool::new(2, true);
        let executed = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let executed = Arc::clone(&executed);
            pool.submit(async move {
                executed.fetch_add(1, Ordering::SeqCst);
                panic!("boom");
            })
            .await
            .unwrap();
        }

        pool.close().await;
        assert_eq!(executed.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn closed_pool_rejects_submit() {
        let pool = Pool::new(2, false);
        pool.close().await;
        let result = pool.submit(async {}).await;
        assert!(matches!(result, Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = Pool::new(2, false);
        pool.submit(async {}).await.unwrap();
        pool.close().await;
        pool.close().await;
    }
}
