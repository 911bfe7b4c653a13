//! LH-Raft: hierarchical, reputation-weighted zone consensus.
//!
//! Devices are grouped into zones. Each zone elects the eligible node with
//! the highest reputation as its leader; a transaction is committed once a
//! strict majority of its zone's eligible group and then a strict majority
//! of all zone leaders acknowledge it.
//!
//! ## Module overview
//!
//! - [`registry`]: [`NodeRegistry`], owner of every node's mutable state.
//! - [`groups`]: [`ZoneGroupFormer`], point-in-time eligible group per zone.
//! - [`elector`]: [`LeaderElector`], per-zone election state machine and
//!   the zone → leader map.
//! - [`pool`]: bounded worker pool running asynchronous re-elections.
//! - [`transport`]: the messaging abstraction quorum phases solicit through.
//! - [`quorum`]: strict-majority tallying with a phase deadline.
//! - [`propagator`]: [`TransactionPropagator`], the two-tier commit.
//! - [`error`]: consensus error taxonomy.

pub mod config;
pub mod elector;
pub mod error;
pub mod groups;
pub mod node;
pub mod pool;
pub mod propagator;
pub mod quorum;
pub mod registry;
pub mod transaction;
pub mod transport;

pub use config::ConsensusConfig;
pub use elector::{ElectionObserver, LeaderElector, ReputationUpdate};
pub use error::ConsensusError;
pub use groups::ZoneGroupFormer;
pub use node::{ConsensusNode, NodeState};
pub use pool::{ElectionHandle, ElectionPool};
pub use propagator::{PropagationReceipt, TransactionPropagator};
pub use quorum::{majority, Phase, PhaseTally, QuorumOutcome};
pub use registry::NodeRegistry;
pub use transaction::Transaction;
pub use transport::{Ack, LoopbackTransport, QuorumTransport, TransportError};
