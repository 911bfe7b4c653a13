//! Fundamental types for LH-Raft zone consensus.
//!
//! Identifiers, timestamps and the reputation range shared by every other
//! crate in the workspace.

pub mod id;
pub mod reputation;
pub mod time;

pub use id::{NodeId, ZoneId};
pub use reputation::{clamp01, is_valid_reputation, DEFAULT_REPUTATION};
pub use time::{Clock, SystemClock, Timestamp};
