//! Consensus reputation formulas.

use crate::metrics::ReputationMetrics;
use lhraft_types::clamp01;
use std::time::Duration;

const TRANSACTION_WEIGHT: f64 = 0.4;
const RESPONSE_WEIGHT: f64 = 0.2;
const UPTIME_WEIGHT: f64 = 0.2;
const QUALITY_WEIGHT: f64 = 0.2;

const SUCCESS_IMPACT_WEIGHT: f64 = 0.3;
const TIME_IMPACT_WEIGHT: f64 = 0.7;

/// How far a single outcome moves reputation toward its impact.
pub const SMOOTHING_RATE: f64 = 0.1;

/// Responses at or beyond this latency contribute no time impact.
pub const MAX_RESPONSE_TIME: Duration = Duration::from_secs(5);

/// Weighted reputation score of a metrics snapshot, clamped to `[0, 1]`.
///
/// `0.4·success + 0.2·response + 0.2·uptime + 0.2·quality`
pub fn score(metrics: &ReputationMetrics) -> f64 {
    let raw = metrics.transaction_success * TRANSACTION_WEIGHT
        + metrics.response_time * RESPONSE_WEIGHT
        + metrics.uptime * UPTIME_WEIGHT
        + metrics.data_quality * QUALITY_WEIGHT;
    clamp01(raw)
}

/// Move `current` toward the impact of one observed outcome.
///
/// `impact = 0.3·success + 0.7·(1 − min(1, rt / 5s))` and the result is
/// `current + 0.1·(impact − current)`, clamped to `[0, 1]`.
pub fn adjust_on_outcome(current: f64, success: bool, response_time: Duration) -> f64 {
    let success_impact = if success { 1.0 } else { 0.0 };
    let time_impact = 1.0 - time_ratio(response_time).min(1.0);
    let impact = success_impact * SUCCESS_IMPACT_WEIGHT + time_impact * TIME_IMPACT_WEIGHT;
    clamp01(current + SMOOTHING_RATE * (impact - current))
}

pub(crate) fn time_ratio(response_time: Duration) -> f64 {
    response_time.as_secs_f64() / MAX_RESPONSE_TIME.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_metrics_score_one() {
        assert_eq!(score(&ReputationMetrics::uniform(1.0)), 1.0);
    }

    #[test]
    fn zero_metrics_score_zero() {
        assert_eq!(score(&ReputationMetrics::uniform(0.0)), 0.0);
    }

    #[test]
    fn transaction_success_dominates() {
        let success_only = ReputationMetrics::new(1.0, 0.0, 0.0, 0.0);
        let uptime_only = ReputationMetrics::new(0.0, 0.0, 1.0, 0.0);
        assert!(score(&success_only) > score(&uptime_only));
        assert!((score(&success_only) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(score(&ReputationMetrics::uniform(3.0)), 1.0);
        assert_eq!(score(&ReputationMetrics::uniform(-1.0)), 0.0);
    }

    #[test]
    fn fast_success_moves_halfway_rep_to_0_55() {
        assert_eq!(adjust_on_outcome(0.5, true, Duration::ZERO), 0.55);
    }

    #[test]
    fn slow_failure_decays_reputation() {
        let next = adjust_on_outcome(0.8, false, Duration::from_secs(10));
        // impact is 0, so 0.8 - 0.08
        assert!((next - 0.72).abs() < 1e-12);
    }

    #[test]
    fn response_time_scales_linearly_below_cap() {
        // half the cap: impact = 0.3 + 0.7 * 0.5 = 0.65
        let next = adjust_on_outcome(0.0, true, Duration::from_millis(2500));
        assert!((next - 0.065).abs() < 1e-12);
    }

    #[test]
    fn single_outcome_moves_at_most_one_tenth() {
        for current in [0.0, 0.3, 0.5, 0.9, 1.0] {
            for success in [true, false] {
                let next = adjust_on_outcome(current, success, Duration::from_millis(700));
                assert!((next - current).abs() <= SMOOTHING_RATE + 1e-12);
            }
        }
    }
}
