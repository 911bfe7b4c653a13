//! LH-Raft node: the request layer over the consensus core.
//!
//! The node wires the consensus core to its collaborators:
//! - A device ledger ([`lhraft_store::DeviceStore`]) for persisted records
//! - A quorum transport ([`lhraft_consensus::QuorumTransport`]) for
//!   propagation
//! - Configuration, structured logging and Prometheus metrics
//!
//! [`ConsensusService`] is the single entry point a request layer calls.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod status;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::{ErrorKind, NodeError};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use service::ConsensusService;
pub use status::{ConsensusStatus, ZoneStatus};
