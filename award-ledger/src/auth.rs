//! Authorization oracle
//!
//! Role and ownership lookups belong to the chat platform. The ledger only
//! asks two questions, both behind [`AuthorizationOracle`].

use crate::config::OracleConfig;
use crate::types::UserId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Permission checks consulted before an update touches the ledger
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    /// Identity whose balance must never be modified (owner, the bot itself)
    async fn is_privileged_identity(&self, user_id: &UserId) -> bool;

    /// Whether `actor` sits strictly above `target` in the role ordering
    async fn outranks(&self, actor: &UserId, target: &UserId) -> bool;
}

/// Oracle backed by a fixed owner, privileged set and rank table
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    owner: Option<UserId>,
    privileged: HashSet<UserId>,
    ranks: HashMap<UserId, u32>,
}

impl StaticOracle {
    /// Create empty oracle (nobody privileged, everyone rank 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration; the agent identity is always privileged
    pub fn from_config(config: &OracleConfig, agent_identity: Option<&UserId>) -> Self {
        let mut oracle = Self::new();
        if let Some(owner) = &config.owner_id {
            oracle = oracle.with_owner(UserId::new(owner.clone()));
        }
        for id in &config.privileged {
            oracle = oracle.with_privileged(UserId::new(id.clone()));
        }
        if let Some(agent) = agent_identity {
            oracle = oracle.with_privileged(agent.clone());
        }
        for (id, rank) in &config.ranks {
            oracle = oracle.with_rank(UserId::new(id.clone()), *rank);
        }
        oracle
    }

    /// Set the owner (privileged, outranks everyone)
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.privileged.insert(owner.clone());
        self.owner = Some(owner);
        self
    }

    /// Mark an identity as privileged
    pub fn with_privileged(mut self, user_id: UserId) -> Self {
        self.privileged.insert(user_id);
        self
    }

    /// Assign a rank (highest role position)
    pub fn with_rank(mut self, user_id: UserId, rank: u32) -> Self {
        self.ranks.insert(user_id, rank);
        self
    }

    fn rank(&self, user_id: &UserId) -> u32 {
        self.ranks.get(user_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AuthorizationOracle for StaticOracle {
    async fn is_privileged_identity(&self, user_id: &UserId) -> bool {
        self.privileged.contains(user_id)
    }

    async fn outranks(&self, actor: &UserId, target: &UserId) -> bool {
        if self.owner.as_ref() == Some(target) {
            return false;
        }
        if self.owner.as_ref() == Some(actor) {
            return true;
        }
        self.rank(actor) > self.rank(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_owner_is_privileged_and_outranks() {
        let oracle = StaticOracle::new().with_owner(UserId::new("owner"));
        let owner = UserId::new("owner");
        let member = UserId::new("member");

        assert!(oracle.is_privileged_identity(&owner).await);
        assert!(!oracle.is_privileged_identity(&member).await);
        assert!(oracle.outranks(&owner, &member).await);
        assert!(!oracle.outranks(&member, &owner).await);
    }

    #[tokio::test]
    async fn test_rank_ordering_is_strict() {
        let oracle = StaticOracle::new()
            .with_rank(UserId::new("mod"), 5)
            .with_rank(UserId::new("peer"), 5)
            .with_rank(UserId::new("member"), 1);

        assert!(oracle.outranks(&UserId::new("mod"), &UserId::new("member")).await);
        assert!(!oracle.outranks(&UserId::new("mod"), &UserId::new("peer")).await);
        assert!(!oracle.outranks(&UserId::new("member"), &UserId::new("mod")).await);
        assert!(!oracle.outranks(&UserId::new("nobody"), &UserId::new("unknown")).await);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = OracleConfig {
            owner_id: Some("1".to_string()),
            privileged: vec!["2".to_string()],
            ranks: HashMap::from([("3".to_string(), 10)]),
        };
        let agent = UserId::new("bot");
        let oracle = StaticOracle::from_config(&config, Some(&agent));

        assert!(oracle.is_privileged_identity(&UserId::new("1")).await);
        assert!(oracle.is_privileged_identity(&UserId::new("2")).await);
        assert!(oracle.is_privileged_identity(&agent).await);
        assert!(oracle.outranks(&UserId::new("3"), &UserId::new("4")).await);
    }
}
