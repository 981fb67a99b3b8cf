//! Delayed one-shot jobs, unique per key.
//!
//! A key stays reserved from `schedule_unique` until the job starts running,
//! so work scheduled while a job for the same key is waiting is folded into
//! that job. Once the job starts a new one may be scheduled.
//!
//! Every spawned job is tracked until it finishes, so shutdown can wait for
//! in-flight flushes rather than only for their timers.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct JobQueue {
    pending: Arc<Mutex<HashSet<String>>>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl JobQueue {
    /// Jobs still waiting when `shutdown` is cancelled run immediately.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashSet::new())),
            tasks: TaskTracker::new(),
            shutdown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `job` once `delay` after this call, unless a job with the same
    /// key is already waiting. Returns whether a job was scheduled.
    pub fn schedule_unique<F, Fut>(&self, key: impl Into<String>, delay: Duration, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        if !self.lock().insert(key.clone()) {
            tracing::debug!(job_key = %key, "Job already pending");
            return false;
        }

        // Measured from here; the task itself may be polled later.
        let deadline = Instant::now() + delay;
        tracing::debug!(job_key = %key, delay_secs = delay.as_secs(), "Job scheduled");
        let queue = self.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = queue.shutdown.cancelled() => {
                    tracing::info!(job_key = %key, "Running pending job early for shutdown");
                }
            }
            queue.lock().remove(&key);
            job().await;
        });

        true
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Jobs spawned and not yet finished, waiting or running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every spawned job has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
