use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Multiplier a viewer applies to a rater's score, in [0.0, 2.0]
#[derive(Debug, Clone, Copy, Serialize, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 2.0;

    /// Weight of a rater the viewer never assigned one to, and of the viewer themself
    pub const DEFAULT: Weight = Weight(1.0);

    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(AppError::InvalidInput(format!(
                "Trust weight {} is outside [{}, {}]",
                value,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Directed trust edge from a viewer to a rater
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrustWeight {
    pub viewer_id: Uuid,
    pub rater_id: Uuid,
    pub weight: Weight,
}

/// A (rater, weight) pair as submitted by a viewer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrustWeightEntry {
    pub rater_id: Uuid,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_bounds_are_inclusive() {
        assert_eq!(Weight::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Weight::new(2.0).unwrap().value(), 2.0);
        assert_eq!(Weight::new(1.25).unwrap().value(), 1.25);
    }

    #[test]
    fn test_weight_rejects_out_of_range() {
        for value in [-0.1, 2.01, f64::NAN] {
            assert!(matches!(Weight::new(value), Err(AppError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_default_weight_is_one() {
        assert_eq!(Weight::default().value(), 1.0);
    }
}
