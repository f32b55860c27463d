//! Validation rules applied to every update
//!
//! Rules run in a fixed order and fail fast:
//!
//! 1. Delta must be non-zero and the target id well-formed
//! 2. Authorization (self-target, privileged target, rank), before any read
//! 3. Balance: the resulting count must not go below zero, nor overflow

use crate::auth::AuthorizationOracle;
use crate::config::AuthorizationConfig;
use crate::error::{Error, Result, ValidationError};
use crate::types::UserId;

/// Reject no-op updates
pub fn check_delta(delta: i64) -> std::result::Result<(), ValidationError> {
    if delta == 0 {
        return Err(ValidationError::ZeroDelta);
    }
    Ok(())
}

/// Checks that need no external lookups
pub fn check_request(target: &UserId, delta: i64) -> std::result::Result<(), ValidationError> {
    check_delta(delta)?;
    if !UserId::is_valid(target.as_str()) {
        return Err(ValidationError::InvalidUserId(target.to_string()));
    }
    Ok(())
}

/// Consult the oracle on behalf of `actor`
pub async fn authorize(
    policy: &AuthorizationConfig,
    oracle: &dyn AuthorizationOracle,
    actor: Option<&UserId>,
    target: &UserId,
) -> std::result::Result<(), ValidationError> {
    if policy.forbid_self_target && actor == Some(target) {
        return Err(ValidationError::SelfTarget);
    }

    if policy.protect_privileged && oracle.is_privileged_identity(target).await {
        return Err(ValidationError::PrivilegedTarget(target.clone()));
    }

    if policy.require_outrank {
        // Without an acting identity there is nobody to outrank the target
        let Some(actor) = actor else {
            return Err(ValidationError::InsufficientRank {
                actor: UserId::new("<anonymous>"),
                target: target.clone(),
            });
        };
        if !oracle.outranks(actor, target).await {
            return Err(ValidationError::InsufficientRank {
                actor: actor.clone(),
                target: target.clone(),
            });
        }
    }

    Ok(())
}

/// Compute the count after applying `delta`
///
/// Balances are never clamped: a result below zero is an error.
pub fn next_count(user_id: &UserId, current: u64, delta: i64) -> Result<u64> {
    match current.checked_add_signed(delta) {
        Some(next) => Ok(next),
        None if delta < 0 => Err(Error::InsufficientBalance {
            user_id: user_id.clone(),
            balance: current,
            requested: delta,
        }),
        None => Err(ValidationError::CountOverflow(user_id.clone()).into()),
    }
}
