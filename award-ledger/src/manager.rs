//! Caller-facing award API
//!
//! [`AwardManager`] ties the update engine to its serial queue. Each manager
//! owns one queue and serves one ledger resource; run several managers to
//! serve several ledgers independently.
//!
//! # Example
//!
//! ```no_run
//! use award_ledger::{AwardManager, Config, StaticOracle, MemoryStorage, UserId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> award_ledger::Result<()> {
//!     let config = Config::default();
//!     let manager = AwardManager::new(
//!         &config,
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(StaticOracle::new()),
//!     );
//!
//!     let outcome = manager
//!         .update_awards(UserId::new("42"), 3, Some(UserId::new("7")))
//!         .await?;
//!     assert_eq!(outcome.count, 3);
//!
//!     manager.when_idle().await;
//!     Ok(())
//! }
//! ```

use crate::{
    auth::AuthorizationOracle,
    engine::UpdateEngine,
    metrics::Metrics,
    queue::{JobHandle, SerialQueue},
    storage::LedgerStorage,
    types::{Encoding, Ledger, UpdateOutcome, UpdateRequest, UserId},
    Config,
};
use std::future::Future;
use std::sync::Arc;

/// Serialized award updates against one ledger
#[derive(Debug, Clone)]
pub struct AwardManager {
    engine: Arc<UpdateEngine>,
    queue: SerialQueue,
}

impl AwardManager {
    /// Create manager with its own queue and metrics registry
    pub fn new(
        config: &Config,
        storage: Arc<dyn LedgerStorage>,
        oracle: Arc<dyn AuthorizationOracle>,
    ) -> Self {
        Self::with_metrics(config, storage, oracle, Metrics::default())
    }

    /// Create manager reporting into `metrics`
    pub fn with_metrics(
        config: &Config,
        storage: Arc<dyn LedgerStorage>,
        oracle: Arc<dyn AuthorizationOracle>,
        metrics: Metrics,
    ) -> Self {
        Self {
            engine: Arc::new(UpdateEngine::new(config, storage, oracle)),
            queue: SerialQueue::new(&config.queue, metrics),
        }
    }

    /// Queue an update of `target`'s balance by `delta`
    ///
    /// `actor` is the requesting user, `None` for system-initiated updates.
    /// The handle settles after every earlier submission has settled.
    pub fn update_awards(
        &self,
        target: UserId,
        delta: i64,
        actor: Option<UserId>,
    ) -> JobHandle<UpdateOutcome> {
        let request = UpdateRequest::new(target, delta, actor);
        let engine = self.engine.clone();

        let handle = self.queue.submit(async move {
            let result = engine.execute(&request).await;
            if let Err(e) = &result {
                if e.is_rejection() {
                    tracing::warn!(
                        user_id = %request.target,
                        delta = request.delta,
                        error = %e,
                        "Award update rejected"
                    );
                } else {
                    tracing::error!(
                        user_id = %request.target,
                        delta = request.delta,
                        error = %e,
                        "Award update failed"
                    );
                }
            }
            result
        });

        tracing::debug!(job_id = %handle.id(), pending = self.queue.pending(), "Queued award update");
        handle
    }

    /// Queue a read of the whole ledger (line-oriented encodings only)
    ///
    /// Goes through the queue so it never observes a half-finished cycle.
    pub fn standings(&self) -> JobHandle<Ledger> {
        let engine = self.engine.clone();
        self.queue.submit(async move { engine.read_ledger().await })
    }

    /// Resolves once every update submitted before this call has settled
    pub fn when_idle(&self) -> impl Future<Output = ()> + Send + 'static {
        self.queue.when_idle()
    }

    /// Encoding of the managed ledger
    pub fn encoding(&self) -> &Encoding {
        self.engine.encoding()
    }

    /// Underlying queue
    pub fn queue(&self) -> &SerialQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticOracle;
    use crate::error::{Error, ValidationError};
    use crate::storage::MemoryStorage;
    use crate::types::ResourceHandle;
    use std::time::Duration;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.queue.pacing_ms = 0;
        config
    }

    fn channel() -> ResourceHandle {
        ResourceHandle::Channel("awards".to_string())
    }

    #[tokio::test]
    async fn test_update_and_read_back() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));

        let outcome = manager
            .update_awards(UserId::new("u1"), 3, Some(UserId::new("giver")))
            .await
            .unwrap();
        assert_eq!(outcome.count, 3);
        assert_eq!(storage.blob(&channel()), "<@u1>🏆x3");

        let ledger = manager.standings().await.unwrap();
        assert_eq!(ledger.count(&UserId::new("u1")), 3);
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_ledger_unchanged() {
        let storage = Arc::new(MemoryStorage::new().with_blob(channel(), "<@u1>🏆x3"));
        let manager = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));

        let result = manager.update_awards(UserId::new("u1"), -5, None).await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(storage.blob(&channel()), "<@u1>🏆x3");
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_lost_updates_under_contention() {
        // Slow storage widens the read/write window
        let storage = Arc::new(MemoryStorage::new().with_latency(Duration::from_millis(1)));
        let manager = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));
        let user = UserId::new("u1");

        let handles: Vec<_> = (0..40)
            .map(|_| manager.update_awards(user.clone(), 1, None))
            .collect();

        let results = settle_all(handles).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(storage.blob(&channel()), "<@u1>🏆x40");
    }

    #[tokio::test]
    async fn test_zero_delta_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));

        let result = manager.update_awards(UserId::new("u1"), 0, None).await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::ZeroDelta))
        ));
        assert_eq!(storage.reads(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_isolated_to_its_job() {
        let storage = Arc::new(MemoryStorage::new().with_latency(Duration::from_millis(5)));
        let manager = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));

        storage.set_fail_writes(true);
        let failing = manager.update_awards(UserId::new("u1"), 1, None);
        assert!(matches!(failing.await, Err(Error::StorageWrite(_))));

        storage.set_fail_writes(false);
        let ok = manager.update_awards(UserId::new("u1"), 2, None).await.unwrap();
        assert_eq!(ok.count, 2);
    }

    #[tokio::test]
    async fn test_managers_are_independent() {
        let storage = Arc::new(MemoryStorage::new());
        let mut other_config = test_config();
        other_config.storage.channel = "kudos".to_string();

        let awards = AwardManager::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));
        let kudos = AwardManager::new(&other_config, storage.clone(), Arc::new(StaticOracle::new()));

        awards.update_awards(UserId::new("a"), 1, None).await.unwrap();
        kudos.update_awards(UserId::new("a"), 5, None).await.unwrap();

        assert_eq!(storage.blob(&channel()), "<@a>🏆x1");
        assert_eq!(
            storage.blob(&ResourceHandle::Channel("kudos".to_string())),
            "<@a>🏆x5"
        );
    }

    async fn settle_all<T>(handles: Vec<JobHandle<T>>) -> Vec<crate::Result<T>> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await);
        }
        results
    }
}
