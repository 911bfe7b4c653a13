use proptest::prelude::*;

use lhraft_consensus::{ConsensusError, LeaderElector, NodeRegistry};
use lhraft_types::{NodeId, Timestamp, ZoneId};
use std::sync::Arc;

const NODES: usize = 6;
const ZONES: usize = 3;

#[derive(Clone, Debug)]
enum Op {
    Elect(usize),
    Set(usize, f64),
}

fn op() -> impl Strategy<Value = Op> {
    let reputation = prop::sample::select(vec![0.0, 0.3, 0.49, 0.5, 0.7, 0.9, 1.0]);
    prop_oneof![
        (0..ZONES).prop_map(Op::Elect),
        (0..NODES, reputation).prop_map(|(n, r)| Op::Set(n, r)),
    ]
}

fn node(i: usize) -> NodeId {
    NodeId::new(format!("n{i}"))
}

fn zone(i: usize) -> ZoneId {
    ZoneId::new(format!("Z{i}"))
}

fn check_invariants(elector: &LeaderElector) -> Result<(), TestCaseError> {
    let threshold = elector.registry().threshold();
    let snapshot = elector.registry().snapshot();
    for z in 0..ZONES {
        let leaders: Vec<_> = snapshot.iter().filter(|n| n.zone == zone(z) && n.is_leader).collect();
        prop_assert!(leaders.len() <= 1, "zone Z{} has {} leaders", z, leaders.len());
    }
    for node in &snapshot {
        prop_assert!((0.0..=1.0).contains(&node.reputation));
        if node.is_leader {
            prop_assert!(node.reputation >= threshold, "ineligible leader {:?}", node);
            prop_assert_eq!(elector.leader_of(&node.zone), Some(node.id.clone()));
        }
    }
    Ok(())
}

proptest! {
    /// No sequence of elections and reputation updates yields two leaders
    /// in a zone or an ineligible leader.
    #[test]
    fn one_eligible_leader_per_zone(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let registry = Arc::new(NodeRegistry::new(0.5));
            for i in 0..NODES {
                registry.register(node(i), zone(i % ZONES), 1.0, Timestamp::EPOCH).unwrap();
            }
            let elector = LeaderElector::new(registry, 2);

            for op in ops {
                match op {
                    Op::Elect(z) => match elector.elect(&zone(z)).await {
                        Ok(leader) => {
                            let best = elector
                                .groups()
                                .eligible(&zone(z))
                                .into_iter()
                                .map(|n| n.reputation)
                                .fold(f64::MIN, f64::max);
                            let chosen = elector.registry().get(&leader).unwrap();
                            prop_assert_eq!(chosen.reputation, best);
                        }
                        Err(e) => {
                            prop_assert_eq!(e, ConsensusError::NoEligibleCandidate(zone(z)));
                            prop_assert_eq!(elector.leader_of(&zone(z)), None);
                        }
                    },
                    Op::Set(n, value) => {
                        let update = elector.update_reputation(&node(n), value).await.unwrap();
                        if let Some(handle) = update.reelection {
                            let _ = handle.wait().await;
                        }
                    }
                }
                check_invariants(&elector)?;
            }
            Ok(())
        })?;
    }

    /// Out-of-range values are rejected and leave the node untouched.
    #[test]
    fn out_of_range_reputation_rejected(value in prop_oneof![-10.0f64..-0.0001, 1.0001f64..10.0]) {
        let registry = NodeRegistry::new(0.5);
        registry.register(node(0), zone(0), 0.7, Timestamp::EPOCH).unwrap();
        prop_assert_eq!(registry.set_reputation(&node(0), value), Err(ConsensusError::InvalidValue(value)));
        prop_assert_eq!(registry.get(&node(0)).unwrap().reputation, 0.7);
    }
}
