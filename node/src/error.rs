use lhraft_consensus::ConsensusError;
use lhraft_store::StoreError;
use lhraft_types::NodeId;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("device {0} not found in the ledger")]
    DeviceNotFound(NodeId),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classes a request layer reports to its clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateEntity,
    InvalidValue,
    NoEligibleCandidate,
    NoLeaderForZone,
    LocalConsensusFailed,
    GlobalConsensusFailed,
    Timeout,
    Storage,
    Internal,
}

impl ErrorKind {
    /// Input errors. These are never worth retrying unchanged.
    pub fn is_validation(self) -> bool {
        matches!(self, Self::NotFound | Self::DuplicateEntity | Self::InvalidValue)
    }
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Consensus(e) => match e {
                ConsensusError::NotFound(_) => ErrorKind::NotFound,
                ConsensusError::DuplicateEntity(_) => ErrorKind::DuplicateEntity,
                ConsensusError::InvalidValue(_) => ErrorKind::InvalidValue,
                ConsensusError::NoEligibleCandidate(_) => ErrorKind::NoEligibleCandidate,
                ConsensusError::NoLeaderForZone(_) => ErrorKind::NoLeaderForZone,
                ConsensusError::LocalConsensusFailed { .. } => ErrorKind::LocalConsensusFailed,
                ConsensusError::GlobalConsensusFailed { .. } => ErrorKind::GlobalConsensusFailed,
                ConsensusError::Timeout { .. } => ErrorKind::Timeout,
                ConsensusError::Cancelled(_)
                | ConsensusError::InvalidTransition { .. }
                | ConsensusError::SittingLeader(_)
                | ConsensusError::Config(_) => ErrorKind::Internal,
            },
            Self::DeviceNotFound(_) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Storage,
            Self::Config(_) | Self::Metrics(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lhraft_consensus::Phase;

    #[test]
    fn maps_onto_request_taxonomy() {
        let timeout = NodeError::from(ConsensusError::Timeout {
            phase: Phase::Global,
            acks: 0,
            required: 2,
        });
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(NodeError::DeviceNotFound(NodeId::from("d")).kind(), ErrorKind::NotFound);
        assert_eq!(
            NodeError::from(StoreError::Backend("disk".into())).kind(),
            ErrorKind::Storage
        );
        assert!(NodeError::from(ConsensusError::InvalidValue(2.0)).kind().is_validation());
        assert!(!ErrorKind::LocalConsensusFailed.is_validation());
    }
}
