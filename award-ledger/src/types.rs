//! Core types for the award ledger
//!
//! The ledger itself is tiny; most of the types here exist so that the
//! external blob, the identity of the resource holding it, and the outcome
//! of a single update cycle are spelled out in the type system.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trophy glyph used by every encoding
pub const TROPHY: &str = "🏆";

/// Display label limit imposed by the chat platform
pub const DEFAULT_MAX_LABEL_LENGTH: usize = 32;

/// Header of the pinned leaderboard message
pub const DEFAULT_LEADERBOARD_HEADER: &str = "🏆 Leaderboard";

/// Chat platform user identifier (opaque)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID without validation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create user ID, rejecting anything the ledger grammar cannot carry
    pub fn parse(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if Self::is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(ValidationError::InvalidUserId(id))
        }
    }

    /// Check an identifier against the mention grammar
    pub fn is_valid(id: &str) -> bool {
        !id.is_empty()
            && !id.starts_with('!')
            && !id
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '@'))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat mention markup (`<@id>`)
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Award counts per user
///
/// Never holds a zero entry: setting a count to zero removes the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger(BTreeMap<UserId, u64>);

impl Ledger {
    /// Create empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count (0 when absent)
    pub fn count(&self, user_id: &UserId) -> u64 {
        self.0.get(user_id).copied().unwrap_or(0)
    }

    /// Set a count, removing the entry when it reaches zero
    pub fn set(&mut self, user_id: UserId, count: u64) {
        if count == 0 {
            self.0.remove(&user_id);
        } else {
            self.0.insert(user_id, count);
        }
    }

    /// Iterate entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, u64)> {
        self.0.iter().map(|(id, count)| (id, *count))
    }

    /// Number of users holding awards
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No user holds any award
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered by count (descending), ties by id
    pub fn standings(&self) -> Vec<(UserId, u64)> {
        let mut entries: Vec<_> = self.iter().map(|(id, c)| (id.clone(), c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

impl FromIterator<(UserId, u64)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (UserId, u64)>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for (id, count) in iter {
            ledger.set(id, count);
        }
        ledger
    }
}

/// How a deployment stores its ledger on the external resource
///
/// Exactly one encoding is chosen per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoding {
    /// One `<@id>🏆xN` line per user on a shared resource (channel topic or
    /// pinned message), optionally preceded by a header line
    LineOriented {
        /// Header emitted as the first line
        #[serde(default)]
        header: Option<String>,
    },

    /// Count embedded as a ` 🏆xN` suffix on each member's display label
    Suffix {
        /// Maximum label length in characters
        #[serde(default = "default_max_label_length")]
        max_length: usize,
    },
}

fn default_max_label_length() -> usize {
    DEFAULT_MAX_LABEL_LENGTH
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::LineOriented { header: None }
    }
}

/// External resource a cycle reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    /// Shared ledger blob (channel topic, pinned message)
    Channel(String),
    /// Display label of one member
    Member(UserId),
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceHandle::Channel(id) => write!(f, "channel:{}", id),
            ResourceHandle::Member(id) => write!(f, "member:{}", id),
        }
    }
}

/// A single award update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// User whose balance changes
    pub target: UserId,
    /// Signed change
    pub delta: i64,
    /// Requesting user; `None` for system-initiated updates
    pub actor: Option<UserId>,
}

impl UpdateRequest {
    /// Create new request
    pub fn new(target: UserId, delta: i64, actor: Option<UserId>) -> Self {
        Self {
            target,
            delta,
            actor,
        }
    }
}

/// Result of a committed update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Target user
    pub user_id: UserId,
    /// Count before the update
    pub previous: u64,
    /// Count after the update
    pub count: u64,
    /// Blob written back to the resource
    pub blob: String,
}
