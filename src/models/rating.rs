use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A stored rating score on the 0.5 to 10.0 scale, in half-point steps
#[derive(Debug, Clone, Copy, Serialize, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    pub const MIN: f64 = 0.5;
    pub const MAX: f64 = 10.0;

    /// Validates a raw score. Out-of-range values are rejected, never clamped.
    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(AppError::InvalidInput(format!(
                "Score {} is outside [{}, {}]",
                value,
                Self::MIN,
                Self::MAX
            )));
        }
        if (value * 2.0).fract() != 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Score {} is not a multiple of 0.5",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Wraps a value that is known to lie on the scale
    pub(crate) const fn from_table(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Rating dimension of an item. Movies only use `Overall`; restaurants are
/// rated separately for vegetarian and non-vegetarian food.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    #[default]
    Overall,
    Vegetarian,
    NonVegetarian,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Overall => "overall",
            Dimension::Vegetarian => "vegetarian",
            Dimension::NonVegetarian => "non_vegetarian",
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overall" => Ok(Dimension::Overall),
            "vegetarian" => Ok(Dimension::Vegetarian),
            "non_vegetarian" => Ok(Dimension::NonVegetarian),
            other => Err(AppError::InvalidInput(format!(
                "Unknown rating dimension '{}'",
                other
            ))),
        }
    }
}

/// Identifies one ratable (item, dimension) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub item_id: Uuid,
    pub dimension: Dimension,
}

impl ItemKey {
    pub fn new(item_id: Uuid, dimension: Dimension) -> Self {
        Self { item_id, dimension }
    }

    /// Key for a single-dimension item such as a movie
    pub fn overall(item_id: Uuid) -> Self {
        Self::new(item_id, Dimension::Overall)
    }
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.item_id, self.dimension)
    }
}

/// One rater's opinion of one item along one dimension
///
/// A record is either available with a score, or marked not applicable with
/// no score. Only available records take part in aggregation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingRecord {
    pub rater_id: Uuid,
    pub item: ItemKey,
    pub score: Option<Score>,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

impl RatingRecord {
    /// Creates an available rating with a score
    pub fn rated(rater_id: Uuid, item: ItemKey, score: Score) -> Self {
        Self {
            rater_id,
            item,
            score: Some(score),
            available: true,
            updated_at: Utc::now(),
        }
    }

    /// Creates a rating explicitly marked as not applicable
    pub fn not_applicable(rater_id: Uuid, item: ItemKey) -> Self {
        Self {
            rater_id,
            item,
            score: None,
            available: false,
            updated_at: Utc::now(),
        }
    }

    /// Score usable for aggregation, if any
    pub fn eligible_score(&self) -> Option<f64> {
        if self.available {
            self.score.map(Score::value)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_accepts_half_steps() {
        assert_eq!(Score::new(0.5).unwrap().value(), 0.5);
        assert_eq!(Score::new(7.5).unwrap().value(), 7.5);
        assert_eq!(Score::new(10.0).unwrap().value(), 10.0);
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        for value in [0.0, 10.5, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Score::new(value), Err(AppError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_score_rejects_off_step_values() {
        assert!(matches!(Score::new(7.3), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_dimension_round_trips_through_str() {
        for dimension in [
            Dimension::Overall,
            Dimension::Vegetarian,
            Dimension::NonVegetarian,
        ] {
            assert_eq!(dimension.as_str().parse::<Dimension>().unwrap(), dimension);
        }
        assert!("vegan".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_dimension_serialization() {
        let json = serde_json::to_string(&Dimension::NonVegetarian).unwrap();
        assert_eq!(json, "\"non_vegetarian\"");
    }

    #[test]
    fn test_not_applicable_is_not_eligible() {
        let item = ItemKey::overall(Uuid::new_v4());
        let record = RatingRecord::not_applicable(Uuid::new_v4(), item);
        assert!(!record.available);
        assert_eq!(record.eligible_score(), None);

        let record = RatingRecord::rated(Uuid::new_v4(), item, Score::new(6.5).unwrap());
        assert_eq!(record.eligible_score(), Some(6.5));
    }
}
