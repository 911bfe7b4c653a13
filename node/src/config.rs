//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use lhraft_consensus::ConsensusConfig;
use lhraft_types::{is_valid_reputation, DEFAULT_REPUTATION};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an LH-Raft node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Minimum consensus reputation to be elected or stay leader.
    #[serde(default = "default_reputation_threshold")]
    pub reputation_threshold: f64,

    /// Size of the bounded pool running re-elections.
    #[serde(default = "default_election_workers")]
    pub election_workers: usize,

    /// Deadline of the zone-local quorum phase, in milliseconds.
    #[serde(default = "default_local_quorum_timeout_ms")]
    pub local_quorum_timeout_ms: u64,

    /// Deadline of the cross-zone quorum phase, in milliseconds.
    #[serde(default = "default_global_quorum_timeout_ms")]
    pub global_quorum_timeout_ms: u64,

    /// Consensus reputation given to newly registered devices.
    #[serde(default = "default_initial_reputation")]
    pub initial_reputation: f64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to render Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_reputation_threshold() -> f64 {
    ConsensusConfig::default().reputation_threshold
}

fn default_election_workers() -> usize {
    ConsensusConfig::default().election_workers
}

fn default_local_quorum_timeout_ms() -> u64 {
    ConsensusConfig::default().local_quorum_timeout.as_millis() as u64
}

fn default_global_quorum_timeout_ms() -> u64 {
    ConsensusConfig::default().global_quorum_timeout.as_millis() as u64
}

fn default_initial_reputation() -> f64 {
    DEFAULT_REPUTATION
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The validated consensus settings.
    pub fn consensus(&self) -> Result<ConsensusConfig, NodeError> {
        let config = ConsensusConfig {
            reputation_threshold: self.reputation_threshold,
            election_workers: self.election_workers,
            local_quorum_timeout: Duration::from_millis(self.local_quorum_timeout_ms),
            global_quorum_timeout: Duration::from_millis(self.global_quorum_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// Check every setting without building anything.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.consensus()?;
        self.log_format()?;
        if !is_valid_reputation(self.initial_reputation) {
            return Err(NodeError::Config(format!(
                "initial_reputation {} is outside [0, 1]",
                self.initial_reputation
            )));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            reputation_threshold: default_reputation_threshold(),
            election_workers: default_election_workers(),
            local_quorum_timeout_ms: default_local_quorum_timeout_ms(),
            global_quorum_timeout_ms: default_global_quorum_timeout_ms(),
            initial_reputation: default_initial_reputation(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
