//! Two-tier transaction propagation.
//!
//! A transaction is first put to its zone's eligible group, then to the set
//! of all current zone leaders. Both phases need a strict majority before
//! their deadline. No lock is held while a phase is waiting on peers: the
//! leader, the group and the leader set are snapshots taken beforehand.

use crate::config::ConsensusConfig;
use crate::elector::LeaderElector;
use crate::error::ConsensusError;
use crate::quorum::{solicit_majority, Phase, PhaseTally};
use crate::transaction::Transaction;
use crate::transport::QuorumTransport;
use lhraft_types::{NodeId, ZoneId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Evidence that a transaction passed both phases.
#[derive(Clone, Debug, PartialEq)]
pub struct PropagationReceipt {
    pub zone: ZoneId,
    /// Leader of the zone when propagation started.
    pub leader: NodeId,
    pub local: PhaseTally,
    pub global: PhaseTally,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct TransactionPropagator {
    elector: LeaderElector,
    transport: Arc<dyn QuorumTransport>,
    local_timeout: Duration,
    global_timeout: Duration,
}

impl TransactionPropagator {
    pub fn new(elector: LeaderElector, transport: Arc<dyn QuorumTransport>, config: &ConsensusConfig) -> Self {
        Self {
            elector,
            transport,
            local_timeout: config.local_quorum_timeout,
            global_timeout: config.global_quorum_timeout,
        }
    }

    /// Commit `tx` through the local and then the global quorum.
    ///
    /// Fails `NoLeaderForZone` if the target zone has no published leader,
    /// `LocalConsensusFailed` / `GlobalConsensusFailed` when a phase cannot
    /// reach a majority, and `Timeout` when a phase's deadline expires. No
    /// retry is attempted.
    pub async fn propagate(&self, tx: &Transaction) -> Result<PropagationReceipt, ConsensusError> {
        let started = Instant::now();
        let zone = &tx.zone;
        let leader = self
            .elector
            .leader_of(zone)
            .ok_or_else(|| ConsensusError::NoLeaderForZone(zone.clone()))?;

        let group = self.elector.groups().candidates(zone);
        let local = solicit_majority(self.transport.as_ref(), Phase::Local, &group, tx, self.local_timeout)
            .await
            .into_result(|t| ConsensusError::LocalConsensusFailed {
                zone: zone.clone(),
                acks: t.acks,
                members: t.members,
                required: t.required,
            })
            .inspect_err(|e| warn!(%zone, error = %e, "local phase failed"))?;

        let leaders: Vec<NodeId> = self.elector.leaders().into_values().collect();
        let global = solicit_majority(self.transport.as_ref(), Phase::Global, &leaders, tx, self.global_timeout)
            .await
            .into_result(|t| ConsensusError::GlobalConsensusFailed {
                acks: t.acks,
                members: t.members,
                required: t.required,
            })
            .inspect_err(|e| warn!(%zone, error = %e, "global phase failed"))?;

        let elapsed = started.elapsed();
        info!(
            %zone,
            %leader,
            local_acks = local.acks,
            global_acks = global.acks,
            elapsed_ms = elapsed.as_millis() as u64,
            "transaction committed"
        );
        Ok(PropagationReceipt {
            zone: zone.clone(),
            leader,
            local,
            global,
            elapsed,
        })
    }
}

impl std::fmt::Debug for TransactionPropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPropagator")
            .field("local_timeout", &self.local_timeout)
            .field("global_timeout", &self.global_timeout)
            .finish_non_exhaustive()
    }
}
