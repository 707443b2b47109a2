//! Periodic job: run a task body on N pool workers, tight-looping or paced
//! by an interval, until told to stop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::pool::Pool;

/// A task body factory: produces a fresh, independently-ownable future for
/// each loop iteration. Task bodies are not `Clone`, so workers ask the
/// factory for a new one every time around the loop.
pub trait TaskFactory: Send + Sync + 'static {
    /// The future returned for one invocation of the task body.
    type Fut: Future<Output = ()> + Send + 'static;

    /// Produce a fresh invocation.
    fn call(&self) -> Self::Fut;
}

impl<F, Fut> TaskFactory for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Fut = Fut;

    fn call(&self) -> Self::Fut {
        (self)()
    }
}

/// Runs `task` repeatedly on `size` workers, either immediately-looping
/// (`interval` is `None`) or paced by a fixed interval.
///
/// `close()` flips a shared stop flag observed at the top of each worker's
/// loop, then closes the underlying [`Pool`] to drain in-flight
/// invocations. `run()` resolves once every worker has exited.
pub struct Job<T: TaskFactory> {
    task: Arc<T>,
    pool: Pool,
    size: usize,
    interval: Option<Duration>,
    stop: Arc<AtomicBool>,
}

impl<T: TaskFactory> Job<T> {
    /// Create a new periodic job.
    ///
    /// `interval = None` means "loop immediately with no pacing" — the
    /// task body itself is expected to provide backpressure (e.g. by
    /// blocking on a subscription receive).
    #[must_use]
    pub fn new(task: T, size: usize, interval: Option<Duration>, auto_recover: bool) -> Self {
        Self {
            task: Arc::new(task),
            pool: Pool::new(size.max(1), auto_recover),
            size: size.max(1),
            interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the job: submit `size` worker loops to the pool and wait for the
    /// pool to drain (which only happens once every worker has observed the
    /// stop flag and exited, i.e. after `close()`).
    pub async fn run(&self) {
        for _ in 0..self.size {
            let task = Arc::clone(&self.task);
            let stop = Arc::clone(&self.stop);
            let interval = self.interval;
            let _ = self
                .pool
                .submit(async move { worker_loop(task, stop, interval).await })
                .await;
        }
        self.pool.close().await;
    }

    /// Signal every worker to stop and wait for the pool to drain.
    pub async fn close(&self) {
        self.stop.store(true, Ordering::Release);
        self.pool.close().await;
    }
}

async fn worker_loop<T: TaskFactory>(task: Arc<T>, stop: Arc<AtomicBool>, interval: Option<Duration>) {
    let mut ticker = interval.map(tokio::time::interval);

    while !stop.load(Ordering::Acquire) {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
            if stop.load(Ordering::Acquire) {
                break;
            }
        }
        task.call().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn immediate_job_runs_until_closed() {
        let executed = Arc::new(AtomicUsize::new(0));
        let job = {
            let executed = Arc::clone(&executed);
            Job::new(
                move || {
                    let executed = Arc::clone(&executed);
                    async move {
                        executed.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(800)).await;
                    }
                },
                5,
                None,
                false,
            )
        };

        let handle = {
            let job = Arc::new(job);
            let job_run = Arc::clone(&job);
            let run_fut = tokio::spawn(async move { job_run.run().await });
            (job, run_fut)
        };
        let (job, run_fut) = handle;

        tokio::time::sleep(Duration::from_secs(1)).await;
        job.close().await;
        run_fut.await.unwrap();

        // Each of the 5 workers runs once at t=0 and once at t=800ms before
        // the 1s mark, then observes the stop flag and exits.
        assert_eq!(executed.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn paced_job_tolerates_tick_alignment() {
        let executed = Arc::new(AtomicUsize::new(0));
        let job = {
            let executed = Arc::clone(&executed);
            Job::new(
                move || {
                    let executed = Arc::clone(&executed);
                    async move {
                        executed.fetch_add(1, Ordering::SeqCst);
                    }
                },
                5,
                Some(Duration::from_millis(800)),
                false,
            )
        };

        let job = Arc::new(job);
        let job_run = Arc::clone(&job);
        let run_fut = tokio::spawn(async move { job_run.run().await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        job.close().await;
        run_fut.await.unwrap();

        let count = executed.load(Ordering::SeqCst);
        assert!(count == 0 || count == 5, "unexpected count {count}");
    }
}
