//! Reputation engine: pure scoring over device performance.
//!
//! Two separate metrics live here and must not be mixed:
//!
//! - The **consensus reputation** decides leader eligibility. It is computed
//!   from a full metrics snapshot with [`score`] or nudged after each
//!   observed outcome with [`adjust_on_outcome`] (exponential smoothing, so a
//!   single bad response cannot flip leadership).
//! - The **device trust** persisted in the ledger is cumulative over the
//!   device's lifetime transaction counts, see [`device_trust`].
//!
//! Nothing in this crate holds state.

pub mod engine;
pub mod metrics;
pub mod trust;

pub use engine::{adjust_on_outcome, score, MAX_RESPONSE_TIME, SMOOTHING_RATE};
pub use metrics::ReputationMetrics;
pub use trust::device_trust;
