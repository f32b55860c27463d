//! Configuration for the award ledger

use crate::codec::{self, MAX_SUFFIX_LENGTH};
use crate::types::{Encoding, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Award ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Identity the ledger acts as for system-initiated updates
    pub agent_identity: Option<String>,

    /// Ledger encoding (fixed for the lifetime of a deployment)
    pub encoding: Encoding,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Queue configuration
    pub queue: QueueConfig,

    /// Authorization policy
    pub authorization: AuthorizationConfig,

    /// Static authorization oracle data
    pub oracle: OracleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "award-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            agent_identity: None,
            encoding: Encoding::default(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
            authorization: AuthorizationConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding file-backed resources
    pub data_dir: PathBuf,

    /// Resource holding a line-oriented ledger (channel id)
    pub channel: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/awards"),
            channel: "awards".to_string(),
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pause between consecutive jobs (milliseconds), courtesy to the
    /// external resource's own rate limits
    pub pacing_ms: u64,
}

impl QueueConfig {
    /// Pacing as a duration
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 100,
        }
    }
}

/// Which authorization rules are enforced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Reject updates where actor and target are the same user
    pub forbid_self_target: bool,

    /// Reject updates targeting privileged identities
    pub protect_privileged: bool,

    /// Require the acting identity to outrank the target
    pub require_outrank: bool,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            forbid_self_target: true,
            protect_privileged: true,
            require_outrank: false,
        }
    }
}

/// Data for the static authorization oracle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Server owner
    pub owner_id: Option<String>,

    /// Additional privileged identities
    pub privileged: Vec<String>,

    /// Rank (highest role position) per user
    pub ranks: HashMap<String, u32>,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("AWARD_LEDGER_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(channel) = std::env::var("AWARD_LEDGER_CHANNEL") {
            config.storage.channel = channel;
        }

        if let Ok(agent) = std::env::var("AWARD_LEDGER_AGENT_ID") {
            config.agent_identity = Some(agent);
        }

        if let Ok(owner) = std::env::var("AWARD_LEDGER_OWNER_ID") {
            config.oracle.owner_id = Some(owner);
        }

        if let Ok(pacing) = std::env::var("AWARD_LEDGER_PACING_MS") {
            config.queue.pacing_ms = pacing
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid pacing: {}", e)))?;
        }

        if let Ok(kind) = std::env::var("AWARD_LEDGER_ENCODING") {
            config.encoding = match kind.as_str() {
                "topic" => Encoding::LineOriented { header: None },
                "leaderboard" => Encoding::LineOriented {
                    header: Some(crate::types::DEFAULT_LEADERBOARD_HEADER.to_string()),
                },
                "nickname" => Encoding::Suffix {
                    max_length: crate::types::DEFAULT_MAX_LABEL_LENGTH,
                },
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown encoding: {}",
                        other
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        match &self.encoding {
            Encoding::Suffix { max_length } if *max_length < MAX_SUFFIX_LENGTH => {
                return Err(crate::Error::Config(format!(
                    "Suffix max_length {} cannot hold a {}-character suffix",
                    max_length, MAX_SUFFIX_LENGTH
                )));
            }
            Encoding::LineOriented {
                header: Some(header),
            } if !codec::is_valid_header(header) => {
                return Err(crate::Error::Config(format!(
                    "Header {:?} must be a single line that is not a ledger entry",
                    header
                )));
            }
            _ => {}
        }

        if let Some(agent) = &self.agent_identity {
            UserId::parse(agent.clone())
                .map_err(|e| crate::Error::Config(format!("agent_identity: {}", e)))?;
        }

        if self.storage.channel.is_empty() {
            return Err(crate::Error::Config("storage.channel is empty".to_string()));
        }

        Ok(())
    }

    /// Agent identity as a user id
    pub fn agent(&self) -> Option<UserId> {
        self.agent_identity.clone().map(UserId::new)
    }
}
