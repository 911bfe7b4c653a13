//! Point-in-time consensus status as reported to clients.

use lhraft_types::{NodeId, ZoneId};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub zone: ZoneId,
    pub leader: Option<NodeId>,
    pub nodes: usize,
    pub eligible_nodes: usize,
}

/// Snapshot returned by `GetConsensusStatus`.
///
/// Zones are read one at a time, so the snapshot is consistent per zone but
/// not across zones.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusStatus {
    pub zones: Vec<ZoneStatus>,
    pub total_nodes: usize,
    pub leaders: usize,
    /// Mean end-to-end propagation latency in milliseconds, `None` until a
    /// transaction has committed.
    pub approximate_latency_ms: Option<f64>,
    pub transactions_committed: u64,
}

impl ConsensusStatus {
    pub fn zone(&self, zone: &ZoneId) -> Option<&ZoneStatus> {
        self.zones.iter().find(|z| z.zone == *zone)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
