//! Metrics collection for observability
//!
//! Prometheus metrics for one award queue. Each queue owns its own
//! [`Registry`] so several ledgers can run side by side in one process.
//!
//! # Metrics
//!
//! - `award_jobs_submitted_total` - Jobs accepted by the queue
//! - `award_jobs_completed_total` - Jobs that settled successfully
//! - `award_jobs_failed_total` - Jobs that settled with an error
//! - `award_queue_depth` - Jobs waiting behind the running one
//! - `award_job_duration_seconds` - Histogram of job execution latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Jobs submitted
    pub jobs_submitted: IntCounter,

    /// Jobs settled with a success value
    pub jobs_completed: IntCounter,

    /// Jobs settled with an error
    pub jobs_failed: IntCounter,

    /// Pending jobs
    pub queue_depth: IntGauge,

    /// Job duration histogram
    pub job_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let jobs_submitted =
            IntCounter::new("award_jobs_submitted_total", "Jobs accepted by the queue")?;
        registry.register(Box::new(jobs_submitted.clone()))?;

        let jobs_completed = IntCounter::new(
            "award_jobs_completed_total",
            "Jobs that settled successfully",
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        let jobs_failed =
            IntCounter::new("award_jobs_failed_total", "Jobs that settled with an error")?;
        registry.register(Box::new(jobs_failed.clone()))?;

        let queue_depth = IntGauge::new("award_queue_depth", "Jobs waiting to run")?;
        registry.register(Box::new(queue_depth.clone()))?;

        let job_duration = Histogram::with_opts(
            HistogramOpts::new(
                "award_job_duration_seconds",
                "Histogram of job execution latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        Ok(Self {
            jobs_submitted,
            jobs_completed,
            jobs_failed,
            queue_depth,
            job_duration,
            registry,
        })
    }

    /// Record a submission
    pub fn record_submitted(&self) {
        self.jobs_submitted.inc();
    }

    /// Record a settled job
    pub fn record_settled(&self, success: bool, duration_seconds: f64) {
        if success {
            self.jobs_completed.inc();
        } else {
            self.jobs_failed.inc();
        }
        self.job_duration.observe(duration_seconds);
    }

    /// Update pending job count
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("jobs_submitted", &self.jobs_submitted.get())
            .field("jobs_completed", &self.jobs_completed.get())
            .field("jobs_failed", &self.jobs_failed.get())
            .field("queue_depth", &self.queue_depth.get())
            .finish()
    }
}
