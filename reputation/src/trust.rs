//! Cumulative device trust recorded in the ledger.

use crate::engine::time_ratio;
use lhraft_types::clamp01;
use std::time::Duration;

const SUCCESS_RATE_WEIGHT: f64 = 0.7;
const RESPONSE_SCORE_WEIGHT: f64 = 0.3;

/// Ledger trust of a device after a transaction.
///
/// `0.7·(successful / total) + 0.3·max(0, 1 − rt / 5s)`, where the counts are
/// lifetime totals including the transaction just recorded and `rt` is that
/// transaction's response time. A device with no transactions has a success
/// rate of zero.
pub fn device_trust(successful: u64, total: u64, response_time: Duration) -> f64 {
    let success_rate = if total == 0 {
        0.0
    } else {
        successful.min(total) as f64 / total as f64
    };
    let response_score = (1.0 - time_ratio(response_time)).max(0.0);
    clamp01(success_rate * SUCCESS_RATE_WEIGHT + response_score * RESPONSE_SCORE_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_successful_and_instant_is_full_trust() {
        assert!((device_trust(10, 10, Duration::ZERO) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trust_is_cumulative_not_smoothed() {
        // 3 of 4 succeeded, 1s response: 0.7 * 0.75 + 0.3 * 0.8
        let trust = device_trust(3, 4, Duration::from_millis(1000));
        assert!((trust - 0.765).abs() < 1e-12);
    }

    #[test]
    fn slow_responses_floor_at_zero_time_score() {
        let trust = device_trust(1, 2, Duration::from_secs(30));
        assert!((trust - 0.35).abs() < 1e-12);
    }

    #[test]
    fn no_transactions_counts_only_response_time() {
        let trust = device_trust(0, 0, Duration::ZERO);
        assert!((trust - 0.3).abs() < 1e-12);
    }
}
