//! Error types for the award ledger

use crate::types::UserId;
use thiserror::Error;

/// Result type for award ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Award ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected by a validation or authorization rule
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Update would drive a balance below zero
    #[error("{user_id} only has {balance} award(s), cannot apply {requested}")]
    InsufficientBalance {
        /// Target user
        user_id: UserId,
        /// Balance before the rejected update
        balance: u64,
        /// Requested delta
        requested: i64,
    },

    /// Reading the external blob failed
    #[error("Storage read failed: {0}")]
    StorageRead(StorageError),

    /// Writing the external blob failed
    #[error("Storage write failed: {0}")]
    StorageWrite(StorageError),

    /// Job panicked, or was refused outside a Tokio runtime
    #[error("Job aborted: {0}")]
    JobAborted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rules a request can break before any ledger state is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Delta of zero
    #[error("award delta must be non-zero")]
    ZeroDelta,

    /// Actor tried to modify their own balance
    #[error("you cannot award yourself")]
    SelfTarget,

    /// Target is a protected identity
    #[error("{0} is a privileged identity and cannot be modified")]
    PrivilegedTarget(UserId),

    /// Actor does not outrank the target
    #[error("{actor} does not outrank {target}")]
    InsufficientRank {
        /// Acting identity
        actor: UserId,
        /// Target identity
        target: UserId,
    },

    /// Resulting count does not fit the ledger
    #[error("award count for {0} would overflow")]
    CountOverflow(UserId),

    /// Malformed user identifier
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    /// Operation needs a different ledger encoding
    #[error("operation requires a line-oriented ledger")]
    UnsupportedEncoding,
}

/// Failure reported by a storage accessor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{resource}: {reason}")]
pub struct StorageError {
    /// Resource the operation targeted
    pub resource: String,
    /// Accessor-specific reason
    pub reason: String,
}

impl StorageError {
    /// Create new storage error
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

impl Error {
    /// Whether the error came from request validation rather than I/O
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InsufficientBalance { .. })
    }
}
