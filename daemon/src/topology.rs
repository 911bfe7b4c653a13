//! Simulation topology: the devices to register and the workload to run.

use anyhow::Context;
use lhraft_types::{NodeId, ZoneId};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    /// Outcomes reported after the first election round, in order.
    #[serde(default)]
    pub outcomes: Vec<OutcomeEntry>,
    #[serde(default)]
    pub transactions: Vec<TransactionEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeviceEntry {
    pub id: NodeId,
    #[serde(default)]
    pub location: String,
    pub zone: ZoneId,
    /// Consensus reputation to set after registration.
    pub reputation: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutcomeEntry {
    pub device: NodeId,
    pub success: bool,
    #[serde(default)]
    pub response_time_ms: u64,
}

impl OutcomeEntry {
    pub fn response_time(&self) -> Duration {
        Duration::from_millis(self.response_time_ms)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionEntry {
    pub zone: ZoneId,
    #[serde(default)]
    pub payload: String,
}

impl Topology {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading topology {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing topology {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
