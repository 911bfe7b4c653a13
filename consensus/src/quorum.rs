//! Strict-majority vote counting for one consensus phase.

use crate::error::ConsensusError;
use crate::transaction::Transaction;
use crate::transport::{Ack, QuorumTransport};
use futures_util::stream::{FuturesUnordered, StreamExt};
use lhraft_types::NodeId;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// The two tiers of LH-Raft propagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The target zone's eligible group.
    Local,
    /// All current zone leaders.
    Global,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Local => f.write_str("local"),
            Phase::Global => f.write_str("global"),
        }
    }
}

/// Smallest vote count that is a strict majority of `members`.
pub fn majority(members: usize) -> usize {
    members / 2 + 1
}

/// Votes collected in one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseTally {
    pub phase: Phase,
    pub members: usize,
    pub acks: usize,
    pub required: usize,
}

impl PhaseTally {
    pub fn new(phase: Phase, members: usize) -> Self {
        Self {
            phase,
            members,
            acks: 0,
            required: majority(members),
        }
    }

    pub fn reached(&self) -> bool {
        self.members > 0 && self.acks >= self.required
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuorumOutcome {
    /// A strict majority acknowledged.
    Reached(PhaseTally),
    /// Enough peers refused or failed that a majority is out of reach.
    Rejected(PhaseTally),
    /// The deadline passed before the phase was decided.
    TimedOut(PhaseTally),
}

impl QuorumOutcome {
    pub fn tally(&self) -> &PhaseTally {
        match self {
            Self::Reached(t) | Self::Rejected(t) | Self::TimedOut(t) => t,
        }
    }

    /// Turn the outcome into a result. `rejected` builds the phase-specific
    /// failure; a timeout always becomes [`ConsensusError::Timeout`].
    pub fn into_result(
        self,
        rejected: impl FnOnce(PhaseTally) -> ConsensusError,
    ) -> Result<PhaseTally, ConsensusError> {
        match self {
            Self::Reached(t) => Ok(t),
            Self::Rejected(t) => Err(rejected(t)),
            Self::TimedOut(t) => Err(ConsensusError::Timeout {
                phase: t.phase,
                acks: t.acks,
                required: t.required,
            }),
        }
    }
}

/// Solicit every peer concurrently and stop as soon as the phase is decided.
///
/// Negative replies and transport errors count as non-acknowledgements.
/// Replies still in flight when the phase is decided are dropped.
pub async fn solicit_majority(
    transport: &dyn QuorumTransport,
    phase: Phase,
    peers: &[NodeId],
    tx: &Transaction,
    deadline: Duration,
) -> QuorumOutcome {
    let mut tally = PhaseTally::new(phase, peers.len());
    if peers.is_empty() {
        return QuorumOutcome::Rejected(tally);
    }

    let mut replies: FuturesUnordered<_> = peers
        .iter()
        .map(|peer| async move { (peer, transport.solicit(peer, phase, tx).await) })
        .collect();
    let mut outstanding = peers.len();

    let decided = tokio::time::timeout(deadline, async {
        while let Some((peer, reply)) = replies.next().await {
            outstanding -= 1;
            match reply {
                Ok(Ack::Accept) => tally.acks += 1,
                Ok(Ack::Reject) => debug!(%phase, %peer, "peer rejected"),
                Err(e) => debug!(%phase, %peer, error = %e, "peer did not answer"),
            }
            if tally.reached() {
                return true;
            }
            if tally.acks + outstanding < tally.required {
                return false;
            }
        }
        tally.reached()
    })
    .await;

    match decided {
        Ok(true) => QuorumOutcome::Reached(tally),
        Ok(false) => QuorumOutcome::Rejected(tally),
        Err(_) => QuorumOutcome::TimedOut(tally),
    }
}
