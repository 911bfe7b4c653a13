//! Node registry: the single owner of every node's consensus state.
//!
//! The map of nodes sits behind a `RwLock` that is only write-locked to add
//! or remove a node. Each node has its own mutex, so writes to different
//! nodes never contend and writes to the same node are totally ordered.
//! No lock in here is ever held across an `.await`.

use crate::error::ConsensusError;
use crate::node::{ConsensusNode, NodeState};
use lhraft_types::{is_valid_reputation, NodeId, Timestamp, ZoneId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

type NodeCell = Arc<Mutex<ConsensusNode>>;

/// Owns the mapping of node identity to mutable consensus state.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<NodeId, NodeCell>>,
    threshold: f64,
}

impl NodeRegistry {
    /// Create an empty registry. `threshold` is the leadership eligibility
    /// bound used to detect demotions.
    pub fn new(threshold: f64) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Register a new follower node. `now` is its first heartbeat.
    pub fn register(
        &self,
        id: NodeId,
        zone: ZoneId,
        reputation: f64,
        now: Timestamp,
    ) -> Result<(), ConsensusError> {
        if !is_valid_reputation(reputation) {
            return Err(ConsensusError::InvalidValue(reputation));
        }
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(&id) {
            return Err(ConsensusError::DuplicateEntity(id));
        }
        debug!(node = %id, %zone, reputation, "node registered");
        let node = ConsensusNode::new(id.clone(), zone, reputation, now);
        nodes.insert(id, Arc::new(Mutex::new(node)));
        Ok(())
    }

    /// Remove a node that is not currently leading its zone.
    pub fn deregister(&self, id: &NodeId) -> Result<ConsensusNode, ConsensusError> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let cell = nodes
            .get(id)
            .ok_or_else(|| ConsensusError::NotFound(id.clone()))?;
        let snapshot = lock_node(cell).clone();
        if snapshot.is_leader {
            return Err(ConsensusError::SittingLeader(id.clone()));
        }
        nodes.remove(id);
        debug!(node = %id, "node deregistered");
        Ok(snapshot)
    }

    /// Snapshot of one node.
    pub fn get(&self, id: &NodeId) -> Result<ConsensusNode, ConsensusError> {
        let cell = self.cell(id)?;
        let node = lock_node(&cell).clone();
        Ok(node)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.read_nodes().contains_key(id)
    }

    pub fn zone_of(&self, id: &NodeId) -> Result<ZoneId, ConsensusError> {
        let cell = self.cell(id)?;
        let zone = lock_node(&cell).zone.clone();
        Ok(zone)
    }

    /// Atomically replace a node's reputation.
    ///
    /// Returns `true` when the node was leading its zone and the new value is
    /// below the threshold. In that case the node has already been moved back
    /// to `Follower` inside the same write, and the caller is expected to
    /// clear the zone mapping and trigger a re-election.
    pub fn set_reputation(&self, id: &NodeId, value: f64) -> Result<bool, ConsensusError> {
        if !is_valid_reputation(value) {
            return Err(ConsensusError::InvalidValue(value));
        }
        self.update_reputation_with(id, |_| value)
            .map(|(_, demoted)| demoted)
    }

    /// Replace a node's reputation with `f(current)` inside one node-lock
    /// acquisition, so concurrent adjustments of the same node never lose
    /// each other. Returns the new value and the demotion flag of
    /// [`set_reputation`](Self::set_reputation).
    pub fn update_reputation_with(
        &self,
        id: &NodeId,
        f: impl FnOnce(f64) -> f64,
    ) -> Result<(f64, bool), ConsensusError> {
        let cell = self.cell(id)?;
        let mut node = lock_node(&cell);
        let value = f(node.reputation);
        if !is_valid_reputation(value) {
            return Err(ConsensusError::InvalidValue(value));
        }
        let was_leader = node.is_leader;
        node.reputation = value;

        let demoted = was_leader && value < self.threshold;
        if demoted {
            node.state = NodeState::Follower;
            node.is_leader = false;
        }
        Ok((value, demoted))
    }

    /// Move a node to `to`, checking the state machine.
    pub fn transition(&self, id: &NodeId, to: NodeState) -> Result<(), ConsensusError> {
        let cell = self.cell(id)?;
        let mut node = lock_node(&cell);
        if !node.state.can_transition_to(to) {
            return Err(ConsensusError::InvalidTransition {
                node: id.clone(),
                from: node.state,
                to,
            });
        }
        node.state = to;
        node.is_leader = to == NodeState::Leader;
        Ok(())
    }

    /// Run the one-round candidacy for `id`: enter `Candidate`, re-check
    /// eligibility against the live reputation, then settle on `Leader` or
    /// fall back to `Follower`. Returns whether the node now leads.
    ///
    /// A sitting leader that is still eligible stays leader.
    pub fn promote(&self, id: &NodeId, group: Vec<NodeId>) -> Result<bool, ConsensusError> {
        let cell = self.cell(id)?;
        let mut node = lock_node(&cell);
        if node.state != NodeState::Leader {
            node.state = NodeState::Candidate;
        }
        if !node.is_eligible(self.threshold) {
            node.state = NodeState::Follower;
            node.is_leader = false;
            return Ok(false);
        }
        node.state = NodeState::Leader;
        node.is_leader = true;
        node.group_members = group;
        Ok(true)
    }

    /// Step a node down to `Follower`. Returns whether it was leading.
    pub fn demote(&self, id: &NodeId) -> Result<bool, ConsensusError> {
        let cell = self.cell(id)?;
        let mut node = lock_node(&cell);
        let was_leader = node.is_leader;
        node.state = NodeState::Follower;
        node.is_leader = false;
        Ok(was_leader)
    }

    pub fn heartbeat(&self, id: &NodeId, now: Timestamp) -> Result<(), ConsensusError> {
        let cell = self.cell(id)?;
        lock_node(&cell).last_heartbeat = now;
        Ok(())
    }

    /// Consistent per-node snapshots of every node, ordered by id.
    pub fn snapshot(&self) -> Vec<ConsensusNode> {
        self.collect(|_| true)
    }

    /// Snapshots of the nodes registered in `zone`, ordered by id.
    pub fn zone_members(&self, zone: &ZoneId) -> Vec<ConsensusNode> {
        self.collect(|node| node.zone == *zone)
    }

    /// Every zone with at least one registered node.
    pub fn zones(&self) -> BTreeSet<ZoneId> {
        self.snapshot().into_iter().map(|n| n.zone).collect()
    }

    pub fn len(&self) -> usize {
        self.read_nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, filter: impl Fn(&ConsensusNode) -> bool) -> Vec<ConsensusNode> {
        let cells: Vec<NodeCell> = self.read_nodes().values().cloned().collect();
        let mut nodes: Vec<ConsensusNode> = cells
            .iter()
            .map(|cell| lock_node(cell).clone())
            .filter(|node| filter(node))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    fn cell(&self, id: &NodeId) -> Result<NodeCell, ConsensusError> {
        self.read_nodes()
            .get(id)
            .cloned()
            .ok_or_else(|| ConsensusError::NotFound(id.clone()))
    }

    fn read_nodes(&self) -> RwLockReadGuard<'_, HashMap<NodeId, NodeCell>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// Every critical section leaves the node consistent before anything can
// panic, so a poisoned node is still safe to read.
fn lock_node(cell: &NodeCell) -> MutexGuard<'_, ConsensusNode> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn zone(s: &str) -> ZoneId {
        ZoneId::from(s)
    }

    fn registry() -> NodeRegistry {
        let r = NodeRegistry::new(0.5);
        r.register(id("a"), zone("Z1"), 0.9, Timestamp::EPOCH).unwrap();
        r.register(id("b"), zone("Z1"), 0.95, Timestamp::EPOCH).unwrap();
        r.register(id("c"), zone("Z2"), 0.7, Timestamp::EPOCH).unwrap();
        r
    }

    #[test]
    fn register_and_get() {
        let r = registry();
        let a = r.get(&id("a")).unwrap();
        assert_eq!(a.zone, zone("Z1"));
        assert_eq!(a.reputation, 0.9);
        assert_eq!(a.state, NodeState::Follower);
        assert!(!a.is_leader);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let r = registry();
        let err = r.register(id("a"), zone("Z9"), 0.1, Timestamp::EPOCH).unwrap_err();
        assert_eq!(err, ConsensusError::DuplicateEntity(id("a")));
        // original untouched
        assert_eq!(r.get(&id("a")).unwrap().zone, zone("Z1"));
    }

    #[test]
    fn register_rejects_out_of_range_reputation() {
        let r = NodeRegistry::new(0.5);
        assert_eq!(
            r.register(id("x"), zone("Z1"), 1.2, Timestamp::EPOCH),
            Err(ConsensusError::InvalidValue(1.2))
        );
        assert!(r.is_empty());
    }

    #[test]
    fn get_unknown_is_not_found() {
        let r = registry();
        assert_eq!(r.get(&id("nope")), Err(ConsensusError::NotFound(id("nope"))));
    }

    #[test]
    fn set_reputation_rejects_out_of_range_and_keeps_prior() {
        let r = registry();
        assert_eq!(
            r.set_reputation(&id("a"), -0.1),
            Err(ConsensusError::InvalidValue(-0.1))
        );
        assert!(matches!(
            r.set_reputation(&id("a"), f64::NAN),
            Err(ConsensusError::InvalidValue(_))
        ));
        assert_eq!(r.get(&id("a")).unwrap().reputation, 0.9);
    }

    #[test]
    fn set_reputation_unknown_node() {
        let r = registry();
        assert_eq!(
            r.set_reputation(&id("ghost"), 0.5),
            Err(ConsensusError::NotFound(id("ghost")))
        );
    }

    #[test]
    fn set_reputation_on_follower_never_signals() {
        let r = registry();
        assert!(!r.set_reputation(&id("a"), 0.1).unwrap());
        assert_eq!(r.get(&id("a")).unwrap().reputation, 0.1);
    }

    #[test]
    fn set_reputation_signals_and_demotes_leader_below_threshold() {
        let r = registry();
        assert!(r.promote(&id("b"), vec![id("a"), id("b")]).unwrap());

        // still above threshold: no signal
        assert!(!r.set_reputation(&id("b"), 0.6).unwrap());
        assert!(r.get(&id("b")).unwrap().is_leader);

        assert!(r.set_reputation(&id("b"), 0.3).unwrap());
        let b = r.get(&id("b")).unwrap();
        assert!(!b.is_leader);
        assert_eq!(b.state, NodeState::Follower);
        assert_eq!(b.reputation, 0.3);
    }

    #[test]
    fn register_stamps_given_heartbeat() {
        let r = NodeRegistry::new(0.5);
        r.register(id("x"), zone("Z1"), 0.8, Timestamp::new(7)).unwrap();
        assert_eq!(r.get(&id("x")).unwrap().last_heartbeat, Timestamp::new(7));
    }

    #[test]
    fn update_with_sees_current_value() {
        let r = registry();
        let (value, demoted) = r.update_reputation_with(&id("a"), |rep| rep / 2.0).unwrap();
        assert_eq!((value, demoted), (0.45, false));
        assert_eq!(r.get(&id("a")).unwrap().reputation, 0.45);

        assert!(matches!(
            r.update_reputation_with(&id("a"), |rep| rep + 1.0),
            Err(ConsensusError::InvalidValue(_))
        ));
        assert_eq!(r.get(&id("a")).unwrap().reputation, 0.45);
    }

    #[test]
    fn concurrent_adjustments_are_not_lost() {
        let r = Arc::new(NodeRegistry::new(0.5));
        r.register(id("n"), zone("Z1"), 0.0, Timestamp::EPOCH).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                thread::spawn(move || {
                    for _ in 0..100 {
                        r.update_reputation_with(&id("n"), |rep| rep + 0.001).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!((r.get(&id("n")).unwrap().reputation - 0.8).abs() < 1e-9);
    }

    #[test]
    fn promote_rechecks_eligibility() {
        let r = registry();
        r.set_reputation(&id("a"), 0.2).unwrap();
        assert!(!r.promote(&id("a"), vec![]).unwrap());
        assert_eq!(r.get(&id("a")).unwrap().state, NodeState::Follower);

        assert!(r.promote(&id("c"), vec![id("c")]).unwrap());
        let c = r.get(&id("c")).unwrap();
        assert_eq!(c.state, NodeState::Leader);
        assert_eq!(c.group_members, vec![id("c")]);
    }

    #[test]
    fn transition_follows_state_machine() {
        let r = registry();
        r.transition(&id("a"), NodeState::Leader).unwrap();
        assert!(r.get(&id("a")).unwrap().is_leader);
        let err = r.transition(&id("a"), NodeState::Candidate).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidTransition { .. }));
        r.transition(&id("a"), NodeState::Follower).unwrap();
        assert!(!r.get(&id("a")).unwrap().is_leader);
    }

    #[test]
    fn deregister_refuses_sitting_leader() {
        let r = registry();
        r.promote(&id("c"), vec![id("c")]).unwrap();
        assert_eq!(r.deregister(&id("c")), Err(ConsensusError::SittingLeader(id("c"))));
        let removed = r.deregister(&id("a")).unwrap();
        assert_eq!(removed.id, id("a"));
        assert!(!r.contains(&id("a")));
        assert_eq!(r.deregister(&id("a")), Err(ConsensusError::NotFound(id("a"))));
    }

    #[test]
    fn zone_members_and_zones() {
        let r = registry();
        let z1: Vec<_> = r.zone_members(&zone("Z1")).into_iter().map(|n| n.id).collect();
        assert_eq!(z1, vec![id("a"), id("b")]);
        let zones: Vec<_> = r.zones().into_iter().collect();
        assert_eq!(zones, vec![zone("Z1"), zone("Z2")]);
    }

    #[test]
    fn heartbeat_updates_timestamp() {
        let r = registry();
        r.heartbeat(&id("a"), Timestamp::new(42)).unwrap();
        assert_eq!(r.get(&id("a")).unwrap().last_heartbeat, Timestamp::new(42));
    }

    #[test]
    fn concurrent_writers_to_distinct_nodes() {
        let r = Arc::new(NodeRegistry::new(0.5));
        for i in 0..8 {
            r.register(NodeId::new(format!("n{i}")), zone("Z1"), 1.0, Timestamp::EPOCH).unwrap();
        }
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let r = Arc::clone(&r);
                thread::spawn(move || {
                    let node = NodeId::new(format!("n{i}"));
                    for step in 0..100 {
                        r.set_reputation(&node, step as f64 / 100.0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for node in r.snapshot() {
            assert_eq!(node.reputation, 0.99);
        }
    }
}
