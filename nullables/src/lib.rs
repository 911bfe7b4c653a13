//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the consensus core (clock, quorum
//! transport, device ledger) sits behind a trait. This crate provides
//! implementations that:
//! - Return deterministic values
//! - Can be scripted programmatically, including failures
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;
pub mod transport;

pub use clock::NullClock;
pub use store::FlakyStore;
pub use transport::{NullTransport, Reply, Solicitation};
