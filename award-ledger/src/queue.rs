//! Serial task queue
//!
//! Guarantees that at most one read-modify-write cycle runs against a
//! ledger resource at any instant.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Callers (command handlers, any task)           │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ submit(job) -> JobHandle
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │   QueueState (Mutex)                                  │
//! │   pending: VecDeque<QueuedJob>   processing: bool     │
//! │   idle_waiters: Vec<oneshot::Sender<()>>              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ spawned on first submit, exits when empty
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │   drain loop (single task)                            │
//! │   pop head -> run to completion -> deliver outcome    │
//! │   -> optional pacing -> repeat                        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! There is no timeout: a slow job stalls everything queued behind it. That
//! is the price of strict ordering. There is no cancellation either;
//! dropping a [`JobHandle`] discards the outcome, not the job.

use crate::{config::QueueConfig, metrics::Metrics, Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A job owned by the queue until it runs
struct QueuedJob {
    id: Uuid,
    task: Task,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedJob>,
    processing: bool,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

struct Shared {
    state: Mutex<QueueState>,
    pacing: Duration,
    metrics: Metrics,
}

/// FIFO queue executing one job at a time
///
/// Must be used from within a Tokio runtime. Clones share the same queue.
#[derive(Clone)]
pub struct SerialQueue {
    shared: Arc<Shared>,
}

impl SerialQueue {
    /// Create new queue
    pub fn new(config: &QueueConfig, metrics: Metrics) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                pacing: config.pacing(),
                metrics,
            }),
        }
    }

    /// Append a job and start the drain loop if it is not running
    ///
    /// The job does not start before every previously submitted job has
    /// settled. The returned handle resolves with the job's own outcome.
    /// Outside a Tokio runtime the job is refused and the handle resolves to
    /// [`Error::JobAborted`]; the queue is left untouched.
    pub fn submit<T, F>(&self, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let id = Uuid::now_v7();
        let (tx, rx) = oneshot::channel();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Job submitted outside a Tokio runtime");
                let _ = tx.send(Err(Error::JobAborted(format!(
                    "job {} refused: {}",
                    id, e
                ))));
                return JobHandle { id, rx };
            }
        };

        let metrics = self.shared.metrics.clone();

        let task: Task = Box::pin(async move {
            let started = Instant::now();
            let outcome = job.await;
            metrics.record_settled(outcome.is_ok(), started.elapsed().as_secs_f64());

            if let Err(e) = &outcome {
                tracing::debug!(job_id = %id, error = %e, "Job settled with error");
            }

            // Receiver may be gone; the job still ran
            let _ = tx.send(outcome);
        });

        let start_drain = {
            let mut state = self.shared.state.lock();
            state.pending.push_back(QueuedJob { id, task });
            self.shared.metrics.set_queue_depth(state.pending.len());
            !std::mem::replace(&mut state.processing, true)
        };
        self.shared.metrics.record_submitted();

        if start_drain {
            tracing::debug!(job_id = %id, "Starting drain loop");
            runtime.spawn(drain(self.shared.clone()));
        }

        JobHandle { id, rx }
    }

    /// Resolves once the queue is empty and no job is running
    ///
    /// The waiter is registered when this method is called, so the future
    /// covers every job submitted before the call.
    pub fn when_idle(&self) -> impl Future<Output = ()> + Send + 'static {
        let waiter = {
            let mut state = self.shared.state.lock();
            if state.pending.is_empty() && !state.processing {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.idle_waiters.push(tx);
                Some(rx)
            }
        };

        async move {
            if let Some(rx) = waiter {
                let _ = rx.await;
            }
        }
    }

    /// Jobs waiting behind the running one
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// No job pending or running
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.is_empty() && !state.processing
    }

    /// Metrics for this queue
    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SerialQueue")
            .field("pending", &state.pending.len())
            .field("processing", &state.processing)
            .field("idle_waiters", &state.idle_waiters.len())
            .field("pacing", &self.shared.pacing)
            .finish()
    }
}

/// Run queued jobs until the queue is empty, then wake idle waiters
async fn drain(shared: Arc<Shared>) {
    loop {
        let next = {
            let mut state = shared.state.lock();
            let next = state.pending.pop_front();
            shared.metrics.set_queue_depth(state.pending.len());

            if next.is_none() {
                state.processing = false;
                for waiter in state.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
            next
        };

        let Some(QueuedJob { id, task }) = next else {
            tracing::debug!("Queue drained");
            return;
        };

        // Separate task so a panicking job cannot take the loop down
        if let Err(e) = tokio::spawn(task).await {
            tracing::error!(job_id = %id, error = %e, "Job aborted");
            shared.metrics.jobs_failed.inc();
        }

        let more_pending = !shared.state.lock().pending.is_empty();
        if more_pending && !shared.pacing.is_zero() {
            tokio::time::sleep(shared.pacing).await;
        }
    }
}

/// Future resolving to the outcome of one submitted job
#[must_use = "dropping a JobHandle discards the outcome, the job still runs"]
pub struct JobHandle<T> {
    id: Uuid,
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> JobHandle<T> {
    /// Job identifier (appears in logs)
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::JobAborted(format!(
                "job {} ended without an outcome",
                id
            ))),
        })
    }
}

impl<T> std::fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle").field("id", &self.id).finish()
    }
}
