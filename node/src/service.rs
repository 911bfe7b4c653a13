//! Request-layer facade over the consensus core and the device ledger.
//!
//! Every client entry point lands here. The service keeps the ledger record
//! and the registry node of a device in step: a ledger write that fails
//! leaves the registry untouched, and a registration whose ledger write
//! fails is rolled back.
//!
//! Two reputations are kept apart. The ledger trust in
//! [`DeviceRecord::reputation`] is cumulative over recorded transactions;
//! the consensus reputation in the registry is what elections read. Outcome
//! reports and metric snapshots move only the consensus reputation, recorded
//! transactions move only the ledger trust, and a direct request sets both.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use lhraft_consensus::{
    ConsensusError, ElectionObserver, LeaderElector, NodeRegistry, PropagationReceipt, QuorumTransport, ReputationUpdate,
    Transaction, TransactionPropagator,
};
use lhraft_reputation::{adjust_on_outcome, device_trust, score, ReputationMetrics};
use lhraft_store::{DeviceRecord, DeviceSelector, DeviceStatus, DeviceStore};
use lhraft_types::{is_valid_reputation, Clock, NodeId, SystemClock, ZoneId};
use tracing::{debug, info, warn, Instrument};

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::status::{ConsensusStatus, ZoneStatus};
use crate::tracing_spans::{election_span, propagation_span, reputation_span};
use crate::NodeError;

pub struct ConsensusService {
    store: Arc<dyn DeviceStore>,
    elector: LeaderElector,
    propagator: TransactionPropagator,
    clock: Arc<dyn Clock>,
    metrics: Arc<NodeMetrics>,
    initial_reputation: f64,
}

impl ConsensusService {
    pub fn new(
        config: &NodeConfig,
        store: Arc<dyn DeviceStore>,
        transport: Arc<dyn QuorumTransport>,
    ) -> Result<Self, NodeError> {
        Self::with_clock(config, store, transport, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &NodeConfig,
        store: Arc<dyn DeviceStore>,
        transport: Arc<dyn QuorumTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let consensus = config.consensus()?;
        let metrics = Arc::new(NodeMetrics::new()?);
        let registry = Arc::new(NodeRegistry::new(consensus.reputation_threshold));
        let observer: Arc<dyn ElectionObserver> = metrics.clone();
        let elector = LeaderElector::with_observer(registry, consensus.election_workers, observer);
        let propagator = TransactionPropagator::new(elector.clone(), transport, &consensus);

        Ok(Self {
            store,
            elector,
            propagator,
            clock,
            metrics,
            initial_reputation: config.initial_reputation,
        })
    }

    pub fn elector(&self) -> &LeaderElector {
        &self.elector
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    // ── Devices ─────────────────────────────────────────────────────────

    /// Register a device in the ledger and as a follower in its zone. Both
    /// start from the configured initial reputation.
    pub fn register_device(
        &self,
        id: NodeId,
        location: impl Into<String>,
        zone: ZoneId,
    ) -> Result<DeviceRecord, NodeError> {
        if self.store.exists(&id)? {
            return Err(ConsensusError::DuplicateEntity(id).into());
        }
        let now = self.clock.now();
        self.registry()
            .register(id.clone(), zone.clone(), self.initial_reputation, now)?;

        let mut record = DeviceRecord::new(id.clone(), location, zone, now);
        record.reputation = self.initial_reputation;
        if let Err(e) = self.store.put_device(&record) {
            if let Err(rollback) = self.registry().deregister(&id) {
                warn!(device = %id, error = %rollback, "could not roll back registration");
            }
            return Err(e.into());
        }

        self.refresh_gauges();
        info!(device = %id, zone = %record.zone_id, "device registered");
        Ok(record)
    }

    pub fn query_device(&self, id: &NodeId) -> Result<DeviceRecord, NodeError> {
        self.store
            .get_device(id)?
            .ok_or_else(|| NodeError::DeviceNotFound(id.clone()))
    }

    /// Set a device's reputation in the ledger, then in the registry.
    ///
    /// If this demotes the zone leader the returned update carries the
    /// re-election handle.
    pub async fn update_reputation(&self, id: &NodeId, value: f64) -> Result<ReputationUpdate, NodeError> {
        if !is_valid_reputation(value) {
            return Err(ConsensusError::InvalidValue(value).into());
        }
        self.registry().get(id)?;

        let mut record = self.query_device(id)?;
        record.reputation = value;
        record.last_update = self.clock.now();
        self.store.put_device(&record)?;

        let update = self
            .elector
            .update_reputation(id, value)
            .instrument(reputation_span(id, "request"))
            .await?;
        Ok(self.after_reputation_update(update))
    }

    /// Nudge a node's consensus reputation towards an observed outcome. The
    /// ledger trust is left alone.
    pub async fn report_outcome(
        &self,
        id: &NodeId,
        success: bool,
        response_time: Duration,
    ) -> Result<ReputationUpdate, NodeError> {
        let update = self
            .elector
            .update_reputation_with(id, move |current| adjust_on_outcome(current, success, response_time))
            .instrument(reputation_span(id, "outcome"))
            .await?;
        debug!(node = %id, next = update.reputation, success, "reputation adjusted on outcome");
        Ok(self.after_reputation_update(update))
    }

    /// Replace a node's consensus reputation with the score of a full
    /// metrics snapshot. The ledger trust is left alone.
    pub async fn apply_metrics(
        &self,
        id: &NodeId,
        metrics: &ReputationMetrics,
    ) -> Result<ReputationUpdate, NodeError> {
        let value = score(metrics);
        let update = self
            .elector
            .update_reputation(id, value)
            .instrument(reputation_span(id, "metrics"))
            .await?;
        Ok(self.after_reputation_update(update))
    }

    /// Count a transaction in the ledger and recompute the device trust.
    /// The consensus reputation is not affected.
    pub fn record_transaction(
        &self,
        id: &NodeId,
        success: bool,
        response_time: Duration,
    ) -> Result<DeviceRecord, NodeError> {
        let mut record = self.query_device(id)?;
        record.record_outcome(success);
        record.reputation = device_trust(record.successful_tx, record.transaction_count, response_time);
        record.last_update = self.clock.now();
        self.store.put_device(&record)?;
        Ok(record)
    }

    pub fn update_device_status(&self, id: &NodeId, status: DeviceStatus) -> Result<DeviceRecord, NodeError> {
        let mut record = self.query_device(id)?;
        record.status = status;
        record.last_update = self.clock.now();
        self.store.put_device(&record)?;
        Ok(record)
    }

    /// Every version of a device's record, oldest first.
    pub fn device_history(&self, id: &NodeId) -> Result<Vec<DeviceRecord>, NodeError> {
        let history = self.store.device_history(id)?;
        if history.is_empty() {
            return Err(NodeError::DeviceNotFound(id.clone()));
        }
        Ok(history)
    }

    pub fn devices_in_zone(&self, zone: &ZoneId) -> Result<Vec<DeviceRecord>, NodeError> {
        Ok(self.store.query_devices(&DeviceSelector::in_zone(zone.clone()))?)
    }

    pub fn heartbeat(&self, id: &NodeId) -> Result<(), NodeError> {
        self.registry().heartbeat(id, self.clock.now())?;
        Ok(())
    }

    // ── Consensus ───────────────────────────────────────────────────────

    pub async fn elect(&self, zone: &ZoneId) -> Result<NodeId, NodeError> {
        let outcome = self.elector.elect(zone).instrument(election_span(zone)).await;
        self.refresh_gauges();
        Ok(outcome?)
    }

    /// Elect every zone concurrently.
    pub async fn elect_all(&self) -> BTreeMap<ZoneId, Result<NodeId, ConsensusError>> {
        let outcomes = self.elector.elect_all().await;
        self.refresh_gauges();
        outcomes
    }

    /// Propagate a payload through its zone and then across zones.
    pub async fn submit_transaction(
        &self,
        zone: ZoneId,
        payload: impl Into<Vec<u8>>,
    ) -> Result<PropagationReceipt, NodeError> {
        let tx = Transaction::new(zone, payload);
        let span = propagation_span(&tx.zone, tx.payload.len());
        match self.propagator.propagate(&tx).instrument(span).await {
            Ok(receipt) => {
                self.metrics.transactions_committed.inc();
                self.metrics
                    .propagation_latency_ms
                    .observe(receipt.elapsed.as_secs_f64() * 1000.0);
                Ok(receipt)
            }
            Err(e) => {
                match e {
                    ConsensusError::LocalConsensusFailed { .. } => self.metrics.local_consensus_failures.inc(),
                    ConsensusError::GlobalConsensusFailed { .. } => self.metrics.global_consensus_failures.inc(),
                    ConsensusError::Timeout { .. } => self.metrics.consensus_timeouts.inc(),
                    _ => {}
                }
                Err(e.into())
            }
        }
    }

    pub fn consensus_status(&self) -> ConsensusStatus {
        self.refresh_gauges();
        let registry = self.registry();
        let threshold = registry.threshold();
        let leaders = self.elector.leaders();

        let zones: Vec<ZoneStatus> = registry
            .zones()
            .into_iter()
            .map(|zone| {
                let members = registry.zone_members(&zone);
                ZoneStatus {
                    leader: leaders.get(&zone).cloned(),
                    nodes: members.len(),
                    eligible_nodes: members.iter().filter(|n| n.is_eligible(threshold)).count(),
                    zone,
                }
            })
            .collect();

        ConsensusStatus {
            total_nodes: zones.iter().map(|z| z.nodes).sum(),
            leaders: zones.iter().filter(|z| z.leader.is_some()).count(),
            zones,
            approximate_latency_ms: self.metrics.mean_latency_ms(),
            transactions_committed: self.metrics.transactions_committed.get(),
        }
    }

    fn registry(&self) -> &Arc<NodeRegistry> {
        self.elector.registry()
    }

    fn after_reputation_update(&self, update: ReputationUpdate) -> ReputationUpdate {
        if update.demoted {
            self.metrics.leader_demotions.inc();
        }
        self.refresh_gauges();
        update
    }

    fn refresh_gauges(&self) {
        self.metrics
            .zones_with_leader
            .set(self.elector.leaders().len() as i64);
        self.metrics.registered_nodes.set(self.registry().len() as i64);
    }
}

impl std::fmt::Debug for ConsensusService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusService")
            .field("elector", &self.elector)
            .field("initial_reputation", &self.initial_reputation)
            .finish_non_exhaustive()
    }
}
