//! Pluggable aggregation and decay policies

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{RankError, Result};

/// Reduction over per-subcategory RU values.
pub trait Aggregation {
    /// `values` is never empty when called by the engine.
    fn reduce(&self, values: &[f64]) -> f64;
}

/// Decay applied to a stored rating after some whole days without an update.
pub trait Decay {
    fn decayed(&self, value: f64, elapsed_days: i64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Arithmetic mean of subcategory values.
    #[default]
    Mean,
    /// Weakest subcategory decides.
    Minimum,
}

impl Aggregation for AggregationPolicy {
    fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            AggregationPolicy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            AggregationPolicy::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayPolicy {
    None,
    /// Fixed RU loss per day, capped at `max_total`.
    Linear { ru_per_day: f64, max_total: f64 },
    /// Halves the rating every `half_life_days`.
    Exponential { half_life_days: f64 },
}

impl Default for DecayPolicy {
    fn default() -> Self {
        DecayPolicy::Linear { ru_per_day: 0.01, max_total: 0.5 }
    }
}

impl DecayPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            DecayPolicy::None => Ok(()),
            DecayPolicy::Linear { ru_per_day, max_total } => {
                if !(ru_per_day.is_finite() && ru_per_day >= 0.0) {
                    return Err(RankError::InvalidConfig(format!(
                        "linear decay ru_per_day must be >= 0, got {}",
                        ru_per_day
                    )));
                }
                if !(max_total.is_finite() && max_total >= 0.0) {
                    return Err(RankError::InvalidConfig(format!(
                        "linear decay max_total must be >= 0, got {}",
                        max_total
                    )));
                }
                Ok(())
            }
            DecayPolicy::Exponential { half_life_days } => {
                if !(half_life_days.is_finite() && half_life_days > 0.0) {
                    return Err(RankError::InvalidConfig(format!(
                        "exponential decay half_life_days must be > 0, got {}",
                        half_life_days
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Decay for DecayPolicy {
    fn decayed(&self, value: f64, elapsed_days: i64) -> f64 {
        // Non-positive ratings sit at or below the floor already.
        if elapsed_days <= 0 || value <= 0.0 {
            return value;
        }
        let days = elapsed_days as f64;

        let lowered = match *self {
            DecayPolicy::None => value,
            DecayPolicy::Linear { ru_per_day, max_total } => {
                value - (ru_per_day * days).min(max_total)
            }
            DecayPolicy::Exponential { half_life_days } => {
                value * 0.5f64.powf(days / half_life_days)
            }
        };

        lowered.clamp(0.0, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_minimum() {
        let values = [1.0, 2.0, 4.5];
        assert!((AggregationPolicy::Mean.reduce(&values) - 2.5).abs() < 1e-12);
        assert_eq!(AggregationPolicy::Minimum.reduce(&values), 1.0);
        assert_eq!(AggregationPolicy::Mean.reduce(&[]), 0.0);
    }

    #[test]
    fn test_linear_decay_is_capped_and_floored() {
        let policy = DecayPolicy::Linear { ru_per_day: 0.1, max_total: 0.5 };
        assert!((policy.decayed(3.0, 2) - 2.8).abs() < 1e-12);
        assert!((policy.decayed(3.0, 30) - 2.5).abs() < 1e-12);
        assert_eq!(policy.decayed(0.2, 30), 0.0);
        assert_eq!(policy.decayed(3.0, 0), 3.0);
    }

    #[test]
    fn test_decay_never_raises_or_touches_negative() {
        let policy = DecayPolicy::default();
        assert_eq!(policy.decayed(-0.4, 10), -0.4);
        assert!(policy.decayed(1.0, 5) <= 1.0);
        assert_eq!(DecayPolicy::None.decayed(2.0, 100), 2.0);
    }

    #[test]
    fn test_exponential_decay() {
        let policy = DecayPolicy::Exponential { half_life_days: 10.0 };
        assert!((policy.decayed(4.0, 10) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_policy_validation() {
        assert!(DecayPolicy::Linear { ru_per_day: -1.0, max_total: 1.0 }.validate().is_err());
        assert!(DecayPolicy::Exponential { half_life_days: 0.0 }.validate().is_err());
        assert!(DecayPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_policy_serde_shape() {
        let json = serde_json::to_value(DecayPolicy::default()).unwrap();
        assert_eq!(json["kind"], "linear");
        let parsed: AggregationPolicy = serde_json::from_str("\"minimum\"").unwrap();
        assert_eq!(parsed, AggregationPolicy::Minimum);
    }
}
