//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate the logs of one election or one transaction.

use lhraft_types::{NodeId, ZoneId};
use tracing::{info_span, Span};

/// Span covering one zone election.
pub fn election_span(zone: &ZoneId) -> Span {
    info_span!("election", zone = %zone)
}

/// Span covering both quorum phases of a single transaction.
pub fn propagation_span(zone: &ZoneId, payload_len: usize) -> Span {
    info_span!("propagate", zone = %zone, payload_len)
}

/// Span covering a reputation update and any demotion it causes. `source`
/// names what drove the update: `request`, `outcome` or `metrics`.
pub fn reputation_span(node: &NodeId, source: &'static str) -> Span {
    info_span!("reputation_update", node = %node, source)
}
