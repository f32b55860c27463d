//! Award Ledger
//!
//! Per-user award counts persisted as a small text blob on an external
//! resource (channel topic, pinned message, or member display name).
//!
//! # Architecture
//!
//! - **Serial Queue**: One read-modify-write cycle in flight per ledger
//! - **Codec**: Line-oriented or suffix-embedded text encodings
//! - **Update Engine**: Validated transition plus storage round trip
//! - **Collaborators**: Storage accessor and authorization oracle traits
//!
//! # Invariants
//!
//! - Non-negative balances: an update that would go below zero is rejected
//! - No lost updates: cycles against one resource never overlap
//! - FIFO: updates settle in submission order
//! - Round trip: `decode(encode(l)) == l`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod codec;
pub mod validation;
pub mod engine;
pub mod queue;
pub mod manager;
pub mod commands;
pub mod storage;
pub mod auth;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use auth::{AuthorizationOracle, StaticOracle};
pub use config::Config;
pub use error::{Error, Result, StorageError, ValidationError};
pub use manager::AwardManager;
pub use queue::{JobHandle, SerialQueue};
pub use storage::{FileStorage, LedgerStorage, MemoryStorage};
pub use types::{Encoding, Ledger, ResourceHandle, UpdateOutcome, UpdateRequest, UserId};
