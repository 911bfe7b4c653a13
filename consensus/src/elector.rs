//! Leader election: per-zone state machine and the zone → leader map.
//!
//! Every zone has its own async mutex. `elect` and the demotion path of
//! `update_reputation` hold it while they change that zone's leadership, so
//! zones elect independently and in parallel while elections inside one
//! zone are serialized. Registry locks are only ever taken briefly inside
//! the zone critical section and never held while waiting for a zone lock.
//!
//! After the zone lock is acquired an election runs to completion without
//! yielding. An election task aborted through its [`ElectionHandle`] has
//! therefore either applied nothing or applied everything.

use crate::error::ConsensusError;
use crate::groups::ZoneGroupFormer;
use crate::node::ConsensusNode;
use crate::pool::{ElectionHandle, ElectionPool};
use crate::registry::NodeRegistry;
use lhraft_types::{is_valid_reputation, NodeId, ZoneId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Notified of every election that ran to completion, including
/// re-elections dispatched in the background.
///
/// Called while the zone lock is still held; implementations must not block.
pub trait ElectionObserver: Send + Sync {
    /// `zones_led` is the number of zones with a published leader right
    /// after this election.
    fn election_finished(&self, zone: &ZoneId, outcome: &Result<NodeId, ConsensusError>, zones_led: usize);
}

/// Outcome of [`LeaderElector::update_reputation`].
#[derive(Debug)]
pub struct ReputationUpdate {
    pub node: NodeId,
    pub reputation: f64,
    /// Whether the update stripped the node of its zone leadership.
    pub demoted: bool,
    /// The re-election dispatched after a demotion. Drop it to let the
    /// election finish in the background.
    pub reelection: Option<ElectionHandle>,
}

/// Runs elections and owns the zone → leader mapping.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone, Debug)]
pub struct LeaderElector {
    inner: Arc<ElectorInner>,
}

struct ElectorInner {
    registry: Arc<NodeRegistry>,
    groups: ZoneGroupFormer,
    pool: ElectionPool,
    observer: Option<Arc<dyn ElectionObserver>>,
    zone_locks: Mutex<HashMap<ZoneId, Arc<tokio::sync::Mutex<()>>>>,
    /// Published leadership, at most one entry per zone. Only written while
    /// holding that zone's lock.
    leaders: RwLock<BTreeMap<ZoneId, NodeId>>,
}

impl LeaderElector {
    pub fn new(registry: Arc<NodeRegistry>, election_workers: usize) -> Self {
        Self::build(registry, election_workers, None)
    }

    /// Like [`new`](Self::new), reporting every finished election to `observer`.
    pub fn with_observer(
        registry: Arc<NodeRegistry>,
        election_workers: usize,
        observer: Arc<dyn ElectionObserver>,
    ) -> Self {
        Self::build(registry, election_workers, Some(observer))
    }

    fn build(
        registry: Arc<NodeRegistry>,
        election_workers: usize,
        observer: Option<Arc<dyn ElectionObserver>>,
    ) -> Self {
        let groups = ZoneGroupFormer::new(Arc::clone(&registry));
        Self {
            inner: Arc::new(ElectorInner {
                registry,
                groups,
                pool: ElectionPool::new(election_workers),
                observer,
                zone_locks: Mutex::new(HashMap::new()),
                leaders: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.inner.registry
    }

    pub fn groups(&self) -> &ZoneGroupFormer {
        &self.inner.groups
    }

    pub fn pool(&self) -> &ElectionPool {
        &self.inner.pool
    }

    /// Elect the leader of `zone`.
    ///
    /// The eligible node with the highest reputation wins; equal reputations
    /// go to the lowest node id. Re-running on a zone whose leader is still
    /// the best candidate changes nothing. With no eligible node the zone's
    /// mapping is cleared, the previous leader steps down and
    /// `NoEligibleCandidate` is returned.
    pub async fn elect(&self, zone: &ZoneId) -> Result<NodeId, ConsensusError> {
        let lock = self.inner.zone_lock(zone);
        let _guard = lock.lock().await;
        let outcome = self.inner.elect_locked(zone);
        self.inner.notify(zone, &outcome);
        outcome
    }

    /// Schedule an election for `zone` on the bounded pool.
    pub fn spawn_election(&self, zone: ZoneId) -> ElectionHandle {
        let elector = self.clone();
        let target = zone.clone();
        self.inner
            .pool
            .spawn(zone, async move { elector.elect(&target).await })
    }

    /// Elect every zone that has registered nodes, running through the pool.
    pub async fn elect_all(&self) -> BTreeMap<ZoneId, Result<NodeId, ConsensusError>> {
        let handles: Vec<ElectionHandle> = self
            .inner
            .registry
            .zones()
            .into_iter()
            .map(|zone| self.spawn_election(zone))
            .collect();

        let mut outcomes = BTreeMap::new();
        for handle in handles {
            let zone = handle.zone().clone();
            outcomes.insert(zone, handle.wait().await);
        }
        outcomes
    }

    /// Set a node's consensus reputation.
    ///
    /// If this drops a sitting leader below the threshold, the leader is
    /// stepped down, the zone's mapping is removed and a re-election is
    /// dispatched, all before the zone lock is released. The re-election
    /// itself completes asynchronously.
    pub async fn update_reputation(
        &self,
        id: &NodeId,
        value: f64,
    ) -> Result<ReputationUpdate, ConsensusError> {
        if !is_valid_reputation(value) {
            return Err(ConsensusError::InvalidValue(value));
        }
        self.update_reputation_with(id, move |_| value).await
    }

    /// Replace a node's reputation with `f(current)`.
    ///
    /// `f` runs under the node's lock, so concurrent adjustments of one node
    /// are applied one after the other. Demotion handling is that of
    /// [`update_reputation`](Self::update_reputation).
    pub async fn update_reputation_with<F>(&self, id: &NodeId, f: F) -> Result<ReputationUpdate, ConsensusError>
    where
        F: FnOnce(f64) -> f64 + Send,
    {
        let zone = self.inner.registry.zone_of(id)?;

        let lock = self.inner.zone_lock(&zone);
        let _guard = lock.lock().await;

        let (value, demoted) = self.inner.registry.update_reputation_with(id, f)?;
        if !demoted {
            return Ok(ReputationUpdate {
                node: id.clone(),
                reputation: value,
                demoted: false,
                reelection: None,
            });
        }

        self.inner.unpublish_if(&zone, id);
        warn!(node = %id, %zone, reputation = value, "leader fell below threshold, re-electing");
        let reelection = self.spawn_election(zone);

        Ok(ReputationUpdate {
            node: id.clone(),
            reputation: value,
            demoted: true,
            reelection: Some(reelection),
        })
    }

    pub fn leader_of(&self, zone: &ZoneId) -> Option<NodeId> {
        self.inner.read_leaders().get(zone).cloned()
    }

    /// Snapshot of the zone → leader map.
    pub fn leaders(&self) -> BTreeMap<ZoneId, NodeId> {
        self.inner.read_leaders().clone()
    }
}

impl ElectorInner {
    fn zone_lock(&self, zone: &ZoneId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.zone_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(zone.clone()).or_default())
    }

    /// Caller holds the zone lock. Must not yield.
    fn elect_locked(&self, zone: &ZoneId) -> Result<NodeId, ConsensusError> {
        self.settle(zone, self.groups.eligible(zone))
    }

    /// Run the election over the `eligible` snapshot. Nodes deregistered
    /// since the snapshot was taken are skipped.
    fn settle(&self, zone: &ZoneId, eligible: Vec<ConsensusNode>) -> Result<NodeId, ConsensusError> {
        let prior = self.read_leaders().get(zone).cloned();
        let ranked = rank_candidates(eligible);
        let mut group: Vec<NodeId> = ranked.iter().map(|n| n.id.clone()).collect();
        group.sort();

        for candidate in &ranked {
            // Step the old leader down before anyone else is raised so the
            // zone never shows two leaders.
            if let Some(prior) = prior.as_ref().filter(|p| **p != candidate.id) {
                self.retire(prior)?;
            }
            match self.registry.promote(&candidate.id, group.clone()) {
                Ok(true) => {
                    self.publish(zone, candidate.id.clone());
                    if prior.as_ref() == Some(&candidate.id) {
                        debug!(%zone, leader = %candidate.id, "leader unchanged");
                    } else {
                        info!(
                            %zone,
                            leader = %candidate.id,
                            reputation = candidate.reputation,
                            group = group.len(),
                            "zone leader elected"
                        );
                    }
                    return Ok(candidate.id.clone());
                }
                Ok(false) => {
                    debug!(%zone, node = %candidate.id, "candidate lost eligibility during election");
                }
                Err(ConsensusError::NotFound(_)) => {
                    debug!(%zone, node = %candidate.id, "candidate left the registry during election");
                    group.retain(|m| *m != candidate.id);
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(prior) = &prior {
            self.retire(prior)?;
        }
        self.write_leaders().remove(zone);
        warn!(%zone, "no eligible candidate, zone has no leader");
        Err(ConsensusError::NoEligibleCandidate(zone.clone()))
    }

    fn notify(&self, zone: &ZoneId, outcome: &Result<NodeId, ConsensusError>) {
        if let Some(observer) = &self.observer {
            observer.election_finished(zone, outcome, self.read_leaders().len());
        }
    }

    fn retire(&self, id: &NodeId) -> Result<(), ConsensusError> {
        match self.registry.demote(id) {
            Ok(_) | Err(ConsensusError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn publish(&self, zone: &ZoneId, leader: NodeId) {
        self.write_leaders().insert(zone.clone(), leader);
    }

    fn unpublish_if(&self, zone: &ZoneId, leader: &NodeId) {
        let mut leaders = self.write_leaders();
        if leaders.get(zone) == Some(leader) {
            leaders.remove(zone);
        }
    }

    fn read_leaders(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ZoneId, NodeId>> {
        self.leaders.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_leaders(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ZoneId, NodeId>> {
        self.leaders.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ElectorInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElectorInner")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Highest reputation first, ties by ascending id.
fn rank_candidates(mut nodes: Vec<ConsensusNode>) -> Vec<ConsensusNode> {
    nodes.sort_by(|a, b| {
        b.reputation
            .total_cmp(&a.reputation)
            .then_with(|| a.id.cmp(&b.id))
    });
    nodes
}
