//! Zone group formation: which nodes may take part in a zone's election
//! and local quorum.

use crate::node::ConsensusNode;
use crate::registry::NodeRegistry;
use lhraft_types::{NodeId, ZoneId};
use std::sync::Arc;

/// Derives the eligible group of a zone from a registry snapshot.
///
/// Each node is read atomically, but the registry is not locked for the
/// whole computation. The result can be stale by the time it is used;
/// elections re-check eligibility when promoting.
#[derive(Clone, Debug)]
pub struct ZoneGroupFormer {
    registry: Arc<NodeRegistry>,
}

impl ZoneGroupFormer {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// Ids of the nodes in `zone` whose reputation meets the threshold,
    /// ordered by id.
    pub fn candidates(&self, zone: &ZoneId) -> Vec<NodeId> {
        self.eligible(zone).into_iter().map(|n| n.id).collect()
    }

    /// Full snapshots of the eligible nodes in `zone`, ordered by id.
    pub fn eligible(&self, zone: &ZoneId) -> Vec<ConsensusNode> {
        let threshold = self.registry.threshold();
        self.registry
            .zone_members(zone)
            .into_iter()
            .filter(|n| n.is_eligible(threshold))
            .collect()
    }
}
