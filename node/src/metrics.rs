//! Prometheus metrics for an LH-Raft node.
//!
//! Exposes counters, gauges, and a histogram covering elections and
//! transaction propagation. The [`NodeMetrics`] struct owns a dedicated
//! [`Registry`] that can be encoded into the Prometheus text exposition
//! format with [`NodeMetrics::encode`].

use lhraft_consensus::{ConsensusError, ElectionObserver};
use lhraft_types::{NodeId, ZoneId};
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Elections that produced a leader.
    pub elections_won: IntCounter,
    /// Elections that found no eligible candidate.
    pub elections_without_candidate: IntCounter,
    /// Sitting leaders stepped down by a reputation update.
    pub leader_demotions: IntCounter,
    /// Transactions that passed both quorum phases.
    pub transactions_committed: IntCounter,
    /// Transactions that failed the zone-local phase.
    pub local_consensus_failures: IntCounter,
    /// Transactions that failed the cross-zone phase.
    pub global_consensus_failures: IntCounter,
    /// Quorum phases that hit their deadline.
    pub consensus_timeouts: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Zones that currently have a published leader.
    pub zones_with_leader: IntGauge,
    /// Nodes in the consensus registry.
    pub registered_nodes: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// End-to-end propagation time of committed transactions, in milliseconds.
    pub propagation_latency_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let elections_won = register_int_counter_with_registry!(
            Opts::new("lhraft_elections_won_total", "Elections that produced a leader"),
            registry
        )?;

        let elections_without_candidate = register_int_counter_with_registry!(
            Opts::new(
                "lhraft_elections_without_candidate_total",
                "Elections that found no eligible candidate"
            ),
            registry
        )?;

        let leader_demotions = register_int_counter_with_registry!(
            Opts::new(
                "lhraft_leader_demotions_total",
                "Leaders stepped down after falling below the reputation threshold"
            ),
            registry
        )?;

        let transactions_committed = register_int_counter_with_registry!(
            Opts::new(
                "lhraft_transactions_committed_total",
                "Transactions committed through both quorum phases"
            ),
            registry
        )?;

        let local_consensus_failures = register_int_counter_with_registry!(
            Opts::new(
                "lhraft_local_consensus_failures_total",
                "Transactions rejected by the zone-local quorum"
            ),
            registry
        )?;

        let global_consensus_failures = register_int_counter_with_registry!(
            Opts::new(
                "lhraft_global_consensus_failures_total",
                "Transactions rejected by the cross-zone quorum"
            ),
            registry
        )?;

        let consensus_timeouts = register_int_counter_with_registry!(
            Opts::new("lhraft_consensus_timeouts_total", "Quorum phases that timed out"),
            registry
        )?;

        // Gauges
        let zones_with_leader = register_int_gauge_with_registry!(
            Opts::new("lhraft_zones_with_leader", "Zones with a published leader"),
            registry
        )?;

        let registered_nodes = register_int_gauge_with_registry!(
            Opts::new("lhraft_registered_nodes", "Nodes in the consensus registry"),
            registry
        )?;

        // Histogram – exponential buckets covering 1 ms → ~16 s.
        let propagation_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "lhraft_propagation_latency_ms",
                "Transaction propagation latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            elections_won,
            elections_without_candidate,
            leader_demotions,
            transactions_committed,
            local_consensus_failures,
            global_consensus_failures,
            consensus_timeouts,
            zones_with_leader,
            registered_nodes,
            propagation_latency_ms,
        })
    }

    /// Mean propagation latency of committed transactions, if any.
    pub fn mean_latency_ms(&self) -> Option<f64> {
        let count = self.propagation_latency_ms.get_sample_count();
        (count > 0).then(|| self.propagation_latency_ms.get_sample_sum() / count as f64)
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Election counters and the leader gauge follow every completed election,
/// whether it was requested directly or dispatched after a demotion.
impl ElectionObserver for NodeMetrics {
    fn election_finished(&self, _zone: &ZoneId, outcome: &Result<NodeId, ConsensusError>, zones_led: usize) {
        match outcome {
            Ok(_) => self.elections_won.inc(),
            Err(ConsensusError::NoEligibleCandidate(_)) => self.elections_without_candidate.inc(),
            Err(_) => {}
        }
        self.zones_with_leader.set(zones_led as i64);
    }
}

impl std::fmt::Debug for NodeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMetrics")
            .field("elections_won", &self.elections_won.get())
            .field("transactions_committed", &self.transactions_committed.get())
            .field("zones_with_leader", &self.zones_with_leader.get())
            .finish_non_exhaustive()
    }
}
