//! Consensus-relevant state of a single node.

use lhraft_types::{NodeId, Timestamp, ZoneId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a node in its zone.
///
/// ```text
/// Follower ──win──▶ Leader ──reputation < threshold──▶ Follower
///     │                ▲
///     └─▶ Candidate ───┘ (or back to Follower)
/// ```
///
/// Elections resolve in a single round, so `Candidate` is entered and left
/// inside one registry write and never observed from outside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    #[default]
    Follower,
    Candidate,
    Leader,
}

impl NodeState {
    /// Whether the state machine allows moving to `next`. Staying put is
    /// always allowed.
    pub fn can_transition_to(self, next: NodeState) -> bool {
        use NodeState::*;
        self == next
            || matches!(
                (self, next),
                (Follower, Candidate)
                    | (Follower, Leader)
                    | (Candidate, Leader)
                    | (Candidate, Follower)
                    | (Leader, Follower)
            )
    }
}

/// A node as tracked by the [`crate::NodeRegistry`].
///
/// Values handed out by the registry are snapshots; mutating them has no
/// effect on the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusNode {
    pub id: NodeId,
    pub zone: ZoneId,
    /// Consensus reputation, always in `[0, 1]`.
    pub reputation: f64,
    pub is_leader: bool,
    pub state: NodeState,
    /// The eligible group this node was last elected from. Empty unless the
    /// node has led its zone.
    pub group_members: Vec<NodeId>,
    pub last_heartbeat: Timestamp,
}

impl ConsensusNode {
    pub fn new(id: NodeId, zone: ZoneId, reputation: f64, now: Timestamp) -> Self {
        Self {
            id,
            zone,
            reputation,
            is_leader: false,
            state: NodeState::Follower,
            group_members: Vec::new(),
            last_heartbeat: now,
        }
    }

    pub fn is_eligible(&self, threshold: f64) -> bool {
        self.reputation >= threshold
    }
}
