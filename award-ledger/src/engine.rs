//! Ledger update engine
//!
//! [`apply_delta`] is the pure state transition
//! `Ledger x (user, delta) -> Ledger'`, guarded by the non-negativity rule.
//! [`UpdateEngine`] wraps it with the authorization lookups and the
//! read/write round trip against the storage accessor. It knows nothing about
//! queueing: callers must serialize [`UpdateEngine::execute`] per resource.

use crate::{
    auth::AuthorizationOracle,
    codec,
    config::{AuthorizationConfig, Config},
    error::{Error, Result, ValidationError},
    storage::LedgerStorage,
    types::{Encoding, Ledger, ResourceHandle, UpdateOutcome, UpdateRequest, UserId},
    validation::{authorize, check_request, next_count},
};
use std::sync::Arc;

/// Result of a successful transition, not yet written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Re-encoded blob
    pub blob: String,
    /// Count before the delta
    pub previous: u64,
    /// Count after the delta
    pub count: u64,
}

/// Apply `delta` to `target` within `current_blob`
///
/// Fails without producing a blob when the delta is zero, the target id is
/// malformed, the header is not a plain single line, or the resulting count
/// would be negative.
pub fn apply_delta(
    current_blob: &str,
    target: &UserId,
    delta: i64,
    encoding: &Encoding,
) -> Result<Transition> {
    check_request(target, delta)?;

    match encoding {
        Encoding::LineOriented { header } => {
            if let Some(header) = header.as_deref().filter(|h| !codec::is_valid_header(h)) {
                return Err(Error::Config(format!(
                    "header {:?} would be read back as ledger content",
                    header
                )));
            }

            let mut ledger = codec::decode(current_blob);
            let previous = ledger.count(target);
            let count = next_count(target, previous, delta)?;
            ledger.set(target.clone(), count);

            Ok(Transition {
                blob: codec::encode(&ledger, header.as_deref()),
                previous,
                count,
            })
        }
        Encoding::Suffix { max_length } => {
            let (base, embedded) = codec::split_suffix(current_blob);
            let previous = embedded.unwrap_or(0);
            let count = next_count(target, previous, delta)?;
            let base = if base.is_empty() { target.as_str() } else { base };

            Ok(Transition {
                blob: codec::render_label(base, count, *max_length),
                previous,
                count,
            })
        }
    }
}

/// Validated read-modify-write cycle against one ledger
pub struct UpdateEngine {
    storage: Arc<dyn LedgerStorage>,
    oracle: Arc<dyn AuthorizationOracle>,
    encoding: Encoding,
    policy: AuthorizationConfig,
    channel: String,
    agent: Option<UserId>,
}

impl UpdateEngine {
    /// Create engine from configuration and collaborators
    pub fn new(
        config: &Config,
        storage: Arc<dyn LedgerStorage>,
        oracle: Arc<dyn AuthorizationOracle>,
    ) -> Self {
        Self {
            storage,
            oracle,
            encoding: config.encoding.clone(),
            policy: config.authorization.clone(),
            channel: config.storage.channel.clone(),
            agent: config.agent(),
        }
    }

    /// Encoding this engine writes
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Resource holding `target`'s count
    pub fn resource_for(&self, target: &UserId) -> ResourceHandle {
        match self.encoding {
            Encoding::LineOriented { .. } => ResourceHandle::Channel(self.channel.clone()),
            Encoding::Suffix { .. } => ResourceHandle::Member(target.clone()),
        }
    }

    /// Run one update cycle
    ///
    /// Validation and authorization happen before the read; a storage
    /// failure is returned as-is with no retry.
    pub async fn execute(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        let UpdateRequest {
            target,
            delta,
            actor,
        } = request;

        check_request(target, *delta)?;
        let actor = actor.as_ref().or(self.agent.as_ref());
        authorize(&self.policy, self.oracle.as_ref(), actor, target).await?;

        let resource = self.resource_for(target);
        let current = self
            .storage
            .read_blob(&resource)
            .await
            .map_err(Error::StorageRead)?;

        let transition = apply_delta(&current, target, *delta, &self.encoding)?;

        self.storage
            .write_blob(&resource, &transition.blob)
            .await
            .map_err(|e| {
                tracing::error!(resource = %resource, error = %e, "Failed to write ledger");
                Error::StorageWrite(e)
            })?;

        tracing::info!(
            user_id = %target,
            delta,
            previous = transition.previous,
            count = transition.count,
            "Applied award update"
        );

        Ok(UpdateOutcome {
            user_id: target.clone(),
            previous: transition.previous,
            count: transition.count,
            blob: transition.blob,
        })
    }

    /// Read and decode the shared ledger
    pub async fn read_ledger(&self) -> Result<Ledger> {
        if !matches!(self.encoding, Encoding::LineOriented { .. }) {
            return Err(ValidationError::UnsupportedEncoding.into());
        }

        let resource = ResourceHandle::Channel(self.channel.clone());
        let blob = self
            .storage
            .read_blob(&resource)
            .await
            .map_err(Error::StorageRead)?;
        Ok(codec::decode(&blob))
    }
}

impl std::fmt::Debug for UpdateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateEngine")
            .field("encoding", &self.encoding)
            .field("policy", &self.policy)
            .field("channel", &self.channel)
            .field("agent", &self.agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticOracle;
    use crate::storage::MemoryStorage;

    fn topic() -> Encoding {
        Encoding::LineOriented { header: None }
    }

    fn u1() -> UserId {
        UserId::new("u1")
    }

    #[test]
    fn test_award_on_empty_ledger() {
        let t = apply_delta("", &u1(), 3, &topic()).unwrap();
        assert_eq!(t.blob, "<@u1>🏆x3");
        assert_eq!((t.previous, t.count), (0, 3));
    }

    #[test]
    fn test_overdraw_rejected() {
        let result = apply_delta("<@u1>🏆x3", &u1(), -5, &topic());
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
    }

    #[test]
    fn test_redeem_to_zero_removes_entry() {
        let t = apply_delta("<@u1>🏆x2", &u1(), -2, &topic()).unwrap();
        assert_eq!(t.blob, "");
        assert_eq!(t.count, 0);

        let header = Encoding::LineOriented {
            header: Some("Leaderboard".to_string()),
        };
        let t = apply_delta("Leaderboard\n<@u1>🏆x2", &u1(), -2, &header).unwrap();
        assert_eq!(t.blob, "Leaderboard");
    }

    #[test]
    fn test_zero_delta_rejected_regardless_of_state() {
        for blob in ["", "<@u1>🏆x3", "garbage"] {
            let result = apply_delta(blob, &u1(), 0, &topic());
            assert!(matches!(
                result,
                Err(Error::Validation(ValidationError::ZeroDelta))
            ));
        }
    }

    #[test]
    fn test_ledger_like_header_rejected() {
        let ghost_header = Encoding::LineOriented {
            header: Some("Top\n<@ghost>🏆x7".to_string()),
        };

        assert!(matches!(
            apply_delta("", &u1(), 1, &ghost_header),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            apply_delta("", &UserId::new("ghost"), -7, &ghost_header),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_other_users_preserved() {
        let t = apply_delta("<@a>🏆x1\nnoise\n<@b>🏆x4", &UserId::new("a"), 2, &topic()).unwrap();
        assert_eq!(t.blob, "<@a>🏆x3\n<@b>🏆x4");
    }

    #[test]
    fn test_suffix_transitions() {
        let nick = Encoding::Suffix { max_length: 32 };

        let t = apply_delta("alice", &u1(), 1, &nick).unwrap();
        assert_eq!(t.blob, "alice 🏆x1");

        let t = apply_delta("alice 🏆x1", &u1(), -1, &nick).unwrap();
        assert_eq!(t.blob, "alice");

        let t = apply_delta("", &u1(), 2, &nick).unwrap();
        assert_eq!(t.blob, "u1 🏆x2");

        assert!(matches!(
            apply_delta("alice", &u1(), -1, &nick),
            Err(Error::InsufficientBalance { .. })
        ));
    }

    fn test_config() -> Config {
        Config {
            agent_identity: Some("bot".to_string()),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_execute_writes_back() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = UpdateEngine::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));

        let outcome = engine
            .execute(&UpdateRequest::new(u1(), 3, Some(UserId::new("giver"))))
            .await
            .unwrap();
        assert_eq!(outcome.count, 3);

        let channel = ResourceHandle::Channel("awards".to_string());
        assert_eq!(storage.blob(&channel), "<@u1>🏆x3");
    }

    #[tokio::test]
    async fn test_execute_rejects_before_read() {
        let storage = Arc::new(MemoryStorage::new());
        let oracle = StaticOracle::from_config(&Default::default(), Some(&UserId::new("bot")));
        let engine = UpdateEngine::new(&test_config(), storage.clone(), Arc::new(oracle));

        // System-initiated update of the agent's own balance
        let result = engine.execute(&UpdateRequest::new(UserId::new("bot"), 1, None)).await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::SelfTarget))
        ));

        let result = engine.execute(&UpdateRequest::new(u1(), 0, None)).await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::ZeroDelta))
        ));

        assert_eq!(storage.reads(), 0);
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_execute_storage_failures() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = UpdateEngine::new(&test_config(), storage.clone(), Arc::new(StaticOracle::new()));
        let request = UpdateRequest::new(u1(), 1, None);

        storage.set_fail_reads(true);
        assert!(matches!(
            engine.execute(&request).await,
            Err(Error::StorageRead(_))
        ));

        storage.set_fail_reads(false);
        storage.set_fail_writes(true);
        assert!(matches!(
            engine.execute(&request).await,
            Err(Error::StorageWrite(_))
        ));
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_suffix_engine_targets_member_resource() {
        let config = Config {
            encoding: Encoding::Suffix { max_length: 32 },
            ..test_config()
        };
        let member = ResourceHandle::Member(u1());
        let storage = Arc::new(MemoryStorage::new().with_blob(member.clone(), "carol"));
        let engine = UpdateEngine::new(&config, storage.clone(), Arc::new(StaticOracle::new()));

        engine.execute(&UpdateRequest::new(u1(), 4, None)).await.unwrap();
        assert_eq!(storage.blob(&member), "carol 🏆x4");

        assert!(matches!(
            engine.read_ledger().await,
            Err(Error::Validation(ValidationError::UnsupportedEncoding))
        ));
    }
}
