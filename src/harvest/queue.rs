//! Admission control for pagination work.
//!
//! Instead of firing all pages of all streams at the provider concurrently,
//! submitted jobs wait in a shared backlog and a fixed-interval drain task
//! executes at most `drain_batch` of them per tick — a token bucket whose
//! bucket size is the batch and whose refill period is the tick interval.
//! Executed jobs may re-submit their follow-up page, which is how unbounded
//! pagination stays throttled end to end.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_DRAIN_BATCH: usize = 5;

/// Mutex-guarded backlog plus a cancellable drain loop.
///
/// Jobs own their completion channels: a job that fails reports through its
/// own channel and never stops the drain loop or its peers. The queue stops
/// ticking when [`shutdown`](Self::shutdown) fires, which callers do once
/// every top-level job has resolved; no pending job is ever dropped before
/// that.
#[derive(Clone)]
pub struct ThrottledWorkQueue {
    backlog: Arc<Mutex<VecDeque<BoxedJob>>>,
    cancel: CancellationToken,
    drain_interval: Duration,
    drain_batch: usize,
}

impl ThrottledWorkQueue {
    pub fn new(drain_interval: Duration, drain_batch: usize) -> Self {
        Self {
            backlog: Arc::new(Mutex::new(VecDeque::new())),
            cancel: CancellationToken::new(),
            drain_interval,
            drain_batch,
        }
    }

    /// Enqueues a job for a later tick. Never executes synchronously.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.backlog.lock().push_back(Box::pin(job));
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.lock().len()
    }

    pub fn is_idle(&self) -> bool {
        self.backlog.lock().is_empty()
    }

    /// Spawns the drain loop. Each tick takes up to `drain_batch` jobs off
    /// the backlog and runs them; an empty backlog makes the tick a no-op.
    pub fn start(&self) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(queue.drain_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = queue.cancel.cancelled() => break,
                    _ = tick.tick() => queue.drain_once(),
                }
            }
        })
    }

    /// Signals that all top-level work has completed; the drain loop stops
    /// at its next suspension point.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn drain_once(&self) {
        let batch: Vec<BoxedJob> = {
            let mut backlog = self.backlog.lock();
            let take = self.drain_batch.min(backlog.len());
            backlog.drain(..take).collect()
        };
        tracing::debug!(
            backlog = self.backlog_len(),
            drained = batch.len(),
            "drain tick"
        );
        for job in batch {
            tokio::spawn(job);
        }
    }
}

impl std::fmt::Debug for ThrottledWorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledWorkQueue")
            .field("backlog", &self.backlog_len())
            .field("drain_interval", &self.drain_interval)
            .field("drain_batch", &self.drain_batch)
            .finish()
    }
}
