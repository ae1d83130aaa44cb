//! Serial FIFO queue for synthesis jobs

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::Result;

/// A unit of queued work; settles its caller through a channel it captures
pub type QueueJob = BoxFuture<'static, Result<()>>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<QueueJob>,
    draining: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    job_gap: Duration,
}

/// Runs queued jobs one at a time, in enqueue order
///
/// Only one drain task exists at a time. It is started by the first
/// `enqueue` on an idle queue and exits once the queue is empty; the
/// draining flag is cleared under the same lock that guards the jobs, so a
/// job can never be left behind.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("len", &self.len())
            .field("draining", &self.is_draining())
            .field("job_gap", &self.inner.job_gap)
            .finish()
    }
}

impl RequestQueue {
    /// Create a queue that pauses `job_gap` after each job before the next
    #[must_use]
    pub fn new(job_gap: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                job_gap,
            }),
        }
    }

    /// Append a job and start draining if no drain task is running
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime while the queue is idle
    pub fn enqueue(&self, job: QueueJob) {
        let start_drain = {
            let mut state = self.lock();
            state.jobs.push_back(job);
            let idle = !state.draining;
            state.draining = true;
            idle
        };

        if start_drain {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    /// Jobs waiting to start
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Whether no jobs are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain task is currently running
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.lock().draining
    }

    async fn drain(&self) {
        tracing::debug!("speech queue drain started");

        loop {
            let job = {
                let mut state = self.lock();
                if let Some(job) = state.jobs.pop_front() {
                    job
                } else {
                    state.draining = false;
                    break;
                }
            };

            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "queued speech job failed"),
                Err(_) => tracing::error!("queued speech job panicked"),
            }

            if !self.inner.job_gap.is_zero() {
                tokio::time::sleep(self.inner.job_gap).await;
            }
        }

        tracing::debug!("speech queue drained");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
