//! Chat command handlers
//!
//! Registration with the chat platform and transport of replies live
//! outside this crate. Handlers turn a parsed command into ledger calls and
//! a reply.

use crate::manager::AwardManager;
use crate::types::{UserId, TROPHY};
use serde::Serialize;

/// Above this many awards a shoutout shows `🏆xN` instead of repeating the glyph
const MAX_REPEATED_TROPHIES: i64 = 10;

/// Supported commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Give awards to a user
    Shoutout {
        /// Recipient
        to: UserId,
        /// Awards to give
        count: i64,
        /// What the awards are for
        reason: String,
    },

    /// Redeem awards from a user
    Redeem {
        /// User to deduct from
        from: UserId,
        /// Awards to deduct
        amount: i64,
    },

    /// Show the leaderboard
    Standings,

    /// Liveness check
    Ping,
}

/// Reply sent back to the invoking user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Message body
    pub content: String,
    /// Only visible to the invoker
    pub ephemeral: bool,
}

impl Reply {
    fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    fn warning(message: impl std::fmt::Display) -> Self {
        Self::private(format!("⚠️ {}", message))
    }

    /// Whether the command failed or was refused
    pub fn is_warning(&self) -> bool {
        self.ephemeral && self.content.starts_with("⚠️")
    }
}

/// Execute `command` on behalf of `invoker`
pub async fn handle(manager: &AwardManager, invoker: &UserId, command: Command) -> Reply {
    match command {
        Command::Shoutout { to, count, reason } => shoutout(manager, invoker, to, count, reason).await,
        Command::Redeem { from, amount } => redeem(manager, invoker, from, amount).await,
        Command::Standings => standings(manager).await,
        Command::Ping => Reply::private("Pong!"),
    }
}

async fn shoutout(
    manager: &AwardManager,
    invoker: &UserId,
    to: UserId,
    count: i64,
    reason: String,
) -> Reply {
    if count < 0 {
        return Reply::warning("Award count must be positive.");
    }

    match manager
        .update_awards(to.clone(), count, Some(invoker.clone()))
        .await
    {
        Ok(_) => Reply::public(format!(
            "{} gave {} to {} for: {}",
            invoker.mention(),
            trophies(count),
            to.mention(),
            reason
        )),
        Err(e) => Reply::warning(e),
    }
}

async fn redeem(manager: &AwardManager, invoker: &UserId, from: UserId, amount: i64) -> Reply {
    if &from == invoker {
        return Reply::private("You cannot award yourself.");
    }
    if amount < 0 {
        return Reply::warning("Redeem amount must be positive.");
    }

    match manager
        .update_awards(from.clone(), -amount, Some(invoker.clone()))
        .await
    {
        Ok(_) => Reply::public(format!(
            "{} redeemed {}x{} from {}",
            invoker.mention(),
            TROPHY,
            amount,
            from.mention()
        )),
        Err(e) => Reply::warning(e),
    }
}

async fn standings(manager: &AwardManager) -> Reply {
    let ledger = match manager.standings().await {
        Ok(ledger) => ledger,
        Err(e) => return Reply::warning(e),
    };

    if ledger.is_empty() {
        return Reply::public("No awards yet.");
    }

    let lines: Vec<String> = ledger
        .standings()
        .into_iter()
        .enumerate()
        .map(|(rank, (user_id, count))| {
            format!("{}. {} {}x{}", rank + 1, user_id.mention(), TROPHY, count)
        })
        .collect();
    Reply::public(lines.join("\n"))
}

fn trophies(count: i64) -> String {
    if count > MAX_REPEATED_TROPHIES {
        format!("{}x{}", TROPHY, count)
    } else {
        TROPHY.repeat(count as usize)
    }
}
