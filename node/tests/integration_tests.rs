//! Integration tests exercising the full request path:
//! registration → election → reputation updates → propagation → status.
//!
//! These wire the service to a scripted transport and an injectable ledger
//! so failure paths are deterministic.

use lhraft_consensus::{ConsensusError, Phase};
use lhraft_node::{ConsensusService, ErrorKind, NodeConfig, NodeError};
use lhraft_nullables::{FlakyStore, NullTransport, Reply};
use lhraft_store::{DeviceStore, MemoryDeviceStore};
use lhraft_types::{NodeId, ZoneId};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn zone(s: &str) -> ZoneId {
    ZoneId::from(s)
}

fn service_with(transport: Arc<NullTransport>) -> ConsensusService {
    let config = NodeConfig {
        local_quorum_timeout_ms: 100,
        global_quorum_timeout_ms: 100,
        ..NodeConfig::default()
    };
    ConsensusService::new(&config, Arc::new(MemoryDeviceStore::new()), transport).expect("service")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leadership_follows_reputation() {
    let svc = service_with(Arc::new(NullTransport::accepting()));
    svc.register_device(id("A"), "north", zone("Z1")).unwrap();
    svc.register_device(id("B"), "north", zone("Z1")).unwrap();
    svc.update_reputation(&id("A"), 0.9).await.unwrap();
    svc.update_reputation(&id("B"), 0.95).await.unwrap();

    assert_eq!(svc.elect(&zone("Z1")).await.unwrap(), id("B"));

    let update = svc.update_reputation(&id("B"), 0.3).await.unwrap();
    assert!(update.demoted);
    update.reelection.expect("re-election").wait().await.unwrap();

    assert_eq!(svc.elect(&zone("Z1")).await.unwrap(), id("A"));
    assert_eq!(svc.metrics().leader_demotions.get(), 1);
    assert_eq!(svc.query_device(&id("B")).unwrap().reputation, 0.3);
}

#[tokio::test]
async fn repeated_failures_eventually_demote_leader() {
    let svc = service_with(Arc::new(NullTransport::accepting()));
    svc.register_device(id("lead"), "east", zone("Z1")).unwrap();
    svc.register_device(id("spare"), "east", zone("Z1")).unwrap();
    svc.update_reputation(&id("spare"), 0.8).await.unwrap();
    assert_eq!(svc.elect(&zone("Z1")).await.unwrap(), id("lead"));

    // one failure cannot flip leadership
    let first = svc.report_outcome(&id("lead"), false, Duration::from_secs(5)).await.unwrap();
    assert!(!first.demoted);

    let mut demoted = None;
    for _ in 0..20 {
        let update = svc.report_outcome(&id("lead"), false, Duration::from_secs(5)).await.unwrap();
        if update.demoted {
            demoted = update.reelection;
            break;
        }
    }
    let handle = demoted.expect("leader demoted after sustained failures");
    assert_eq!(handle.wait().await, Ok(id("spare")));
    assert_eq!(svc.elector().leader_of(&zone("Z1")), Some(id("spare")));
    // outcome reports never touch the ledger trust
    assert_eq!(svc.query_device(&id("lead")).unwrap().reputation, 1.0);
}

#[tokio::test]
async fn propagation_failures_are_typed_and_counted() {
    let transport = Arc::new(NullTransport::accepting());
    let svc = service_with(Arc::clone(&transport));
    for (n, z) in [("a", "Z1"), ("b", "Z1"), ("c", "Z1"), ("x", "Z2"), ("y", "Z3")] {
        svc.register_device(id(n), "site", zone(z)).unwrap();
    }
    svc.elect_all().await;

    let err = svc.submit_transaction(zone("Z9"), b"tx".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoLeaderForZone);

    transport.reply("b", Reply::Reject).reply("c", Reply::Reject);
    let err = svc.submit_transaction(zone("Z1"), b"tx".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LocalConsensusFailed);

    transport.reply("b", Reply::Accept).reply("x", Reply::Silent).reply("y", Reply::Silent);
    let err = svc.submit_transaction(zone("Z1"), b"tx".to_vec()).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Consensus(ConsensusError::Timeout { phase: Phase::Global, .. })
    ));

    transport.reply("x", Reply::Accept);
    let receipt = svc.submit_transaction(zone("Z1"), b"tx".to_vec()).await.unwrap();
    assert_eq!(receipt.leader, id("a"));

    let metrics = svc.metrics();
    assert_eq!(metrics.local_consensus_failures.get(), 1);
    assert_eq!(metrics.consensus_timeouts.get(), 1);
    assert_eq!(metrics.transactions_committed.get(), 1);
    assert!(metrics.encode().unwrap().contains("lhraft_transactions_committed_total 1"));
}

#[tokio::test]
async fn storage_failure_propagates_unchanged() {
    let store = Arc::new(FlakyStore::new());
    let svc = ConsensusService::new(
        &NodeConfig::default(),
        store.clone(),
        Arc::new(NullTransport::accepting()),
    )
    .unwrap();
    svc.register_device(id("d1"), "lab", zone("Z1")).unwrap();

    store.fail_next_writes(1);
    let err = svc.record_transaction(&id("d1"), true, Duration::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let record = store.get_device(&id("d1")).unwrap().unwrap();
    assert_eq!(record.transaction_count, 0);
    assert_eq!(store.device_history(&id("d1")).unwrap().len(), 1);
}

#[tokio::test]
async fn status_serializes_to_json() {
    let svc = service_with(Arc::new(NullTransport::accepting()));
    svc.register_device(id("a"), "site", zone("Z1")).unwrap();
    svc.elect_all().await;

    let json = svc.consensus_status().to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["zones"][0]["leader"], "a");
    assert_eq!(value["totalNodes"], 1);
    assert!(value["approximateLatencyMs"].is_null());
}
