use crate::node::NodeState;
use crate::quorum::Phase;
use lhraft_types::{NodeId, ZoneId};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConsensusError {
    #[error("node {0} not found")]
    NotFound(NodeId),

    #[error("node {0} is already registered")]
    DuplicateEntity(NodeId),

    #[error("reputation {0} is outside [0, 1]")]
    InvalidValue(f64),

    #[error("no eligible candidate in zone {0}")]
    NoEligibleCandidate(ZoneId),

    #[error("no leader for zone {0}")]
    NoLeaderForZone(ZoneId),

    #[error("local consensus failed in zone {zone}: {acks}/{members} acknowledged, {required} required")]
    LocalConsensusFailed {
        zone: ZoneId,
        acks: usize,
        members: usize,
        required: usize,
    },

    #[error("global consensus failed: {acks}/{members} zone leaders acknowledged, {required} required")]
    GlobalConsensusFailed {
        acks: usize,
        members: usize,
        required: usize,
    },

    #[error("{phase} quorum timed out with {acks}/{required} acknowledgements")]
    Timeout {
        phase: Phase,
        acks: usize,
        required: usize,
    },

    #[error("election for zone {0} was cancelled")]
    Cancelled(ZoneId),

    #[error("node {node} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        node: NodeId,
        from: NodeState,
        to: NodeState,
    },

    #[error("node {0} is the sitting leader of its zone")]
    SittingLeader(NodeId),

    #[error("config error: {0}")]
    Config(String),
}

impl ConsensusError {
    /// Whether this failure came out of a quorum phase rather than input
    /// validation. Callers decide retry policy on this.
    pub fn is_consensus_failure(&self) -> bool {
        matches!(
            self,
            Self::LocalConsensusFailed { .. } | Self::GlobalConsensusFailed { .. } | Self::Timeout { .. }
        )
    }
}
