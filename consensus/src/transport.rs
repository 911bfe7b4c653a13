//! Messaging seam used by the quorum phases.
//!
//! The core assumes reliable point-to-point delivery and never implements a
//! wire protocol. Anything that can ask a peer to acknowledge a transaction
//! plugs in here.

use crate::quorum::Phase;
use crate::transaction::Transaction;
use async_trait::async_trait;
use lhraft_types::NodeId;
use thiserror::Error;

/// A peer's answer to a solicitation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Accept,
    Reject,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("peer {0} is unreachable")]
    Unreachable(NodeId),

    #[error("transport error: {0}")]
    Other(String),
}

/// Asks a single peer to acknowledge `tx` for one consensus phase.
///
/// Implementations may take arbitrarily long; the caller bounds every phase
/// with its own deadline.
#[async_trait]
pub trait QuorumTransport: Send + Sync {
    async fn solicit(&self, peer: &NodeId, phase: Phase, tx: &Transaction) -> Result<Ack, TransportError>;
}

/// In-process transport where every peer accepts immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopbackTransport;

#[async_trait]
impl QuorumTransport for LoopbackTransport {
    async fn solicit(&self, _peer: &NodeId, _phase: Phase, _tx: &Transaction) -> Result<Ack, TransportError> {
        Ok(Ack::Accept)
    }
}
