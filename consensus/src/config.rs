//! Consensus tunables.

use crate::error::ConsensusError;
use lhraft_types::is_valid_reputation;
use std::time::Duration;

/// Settings shared by the elector and the propagator.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusConfig {
    /// Minimum reputation to be elected or to stay leader.
    pub reputation_threshold: f64,
    /// Maximum number of elections running at once.
    pub election_workers: usize,
    /// Deadline for the zone-local quorum phase.
    pub local_quorum_timeout: Duration,
    /// Deadline for the cross-zone quorum phase.
    pub global_quorum_timeout: Duration,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            reputation_threshold: 0.5,
            election_workers: 4,
            local_quorum_timeout: Duration::from_secs(2),
            global_quorum_timeout: Duration::from_secs(5),
        }
    }
}

impl ConsensusConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.reputation_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ConsensusError> {
        if !is_valid_reputation(self.reputation_threshold) {
            return Err(ConsensusError::Config(format!(
                "reputation_threshold {} is outside [0, 1]",
                self.reputation_threshold
            )));
        }
        if self.election_workers == 0 {
            return Err(ConsensusError::Config("election_workers must be at least 1".into()));
        }
        if self.local_quorum_timeout.is_zero() || self.global_quorum_timeout.is_zero() {
            return Err(ConsensusError::Config("quorum timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
