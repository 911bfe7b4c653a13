//! Performance metrics consumed by [`crate::score`].

use serde::{Deserialize, Serialize};

/// Normalized performance snapshot of a node. Every component is expected
/// in `[0, 1]`; the score is clamped regardless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationMetrics {
    /// Fraction of transactions the node handled successfully.
    pub transaction_success: f64,
    /// Responsiveness, 1.0 being instantaneous.
    pub response_time: f64,
    /// Fraction of time the node was reachable.
    pub uptime: f64,
    /// Quality of the data the node reported.
    pub data_quality: f64,
}

impl ReputationMetrics {
    pub fn new(transaction_success: f64, response_time: f64, uptime: f64, data_quality: f64) -> Self {
        Self {
            transaction_success,
            response_time,
            uptime,
            data_quality,
        }
    }

    /// All four components set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }
}
