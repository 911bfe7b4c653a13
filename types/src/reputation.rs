//! The reputation range.
//!
//! Reputation is a normalized score in `[0, 1]`. Registry writes reject
//! anything outside that range; only the scoring formulas clamp.

/// Reputation assigned to a freshly registered device.
pub const DEFAULT_REPUTATION: f64 = 1.0;

/// Whether `value` is a legal reputation. `NaN` is not.
pub fn is_valid_reputation(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Clamp a computed score into `[0, 1]`.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
