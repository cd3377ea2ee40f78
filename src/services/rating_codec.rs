use serde::{Serialize, Serializer};
use std::fmt::Display;

use crate::{
    error::{AppError, AppResult},
    models::{
        Grade::{A, B, C},
        LetterRating, Modifier, Score,
    },
};

const STRONG_NEG: Option<Modifier> = Some(Modifier::StrongNegative);
const NEG: Option<Modifier> = Some(Modifier::Negative);
const NEUTRAL: Option<Modifier> = None;
const POS: Option<Modifier> = Some(Modifier::Positive);
const STRONG_POS: Option<Modifier> = Some(Modifier::StrongPositive);

/// Lowest aggregate score that earns each label, sorted descending.
/// Thresholds sit halfway between neighbouring encoded scores, so weighted
/// averages get a label without ever going through `decode`.
const DISPLAY_THRESHOLDS: [(f64, LetterRating); 15] = [
    (9.75, LetterRating::new(A, STRONG_POS)),
    (9.25, LetterRating::new(A, POS)),
    (8.5, LetterRating::new(A, NEUTRAL)),
    (7.75, LetterRating::new(A, NEG)),
    (7.25, LetterRating::new(A, STRONG_NEG)),
    (6.75, LetterRating::new(B, STRONG_POS)),
    (6.0, LetterRating::new(B, POS)),
    (5.0, LetterRating::new(B, NEUTRAL)),
    (4.25, LetterRating::new(B, NEG)),
    (3.75, LetterRating::new(B, STRONG_NEG)),
    (3.25, LetterRating::new(C, STRONG_POS)),
    (2.5, LetterRating::new(C, POS)),
    (1.5, LetterRating::new(C, NEUTRAL)),
    (0.75, LetterRating::new(C, NEG)),
    (0.0, LetterRating::new(C, STRONG_NEG)),
];

/// Label shown for an aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLabel {
    NotRated,
    Rated(LetterRating),
}

impl Display for ScoreLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreLabel::NotRated => f.write_str("not rated"),
            ScoreLabel::Rated(rating) => write!(f, "{}", rating),
        }
    }
}

impl Serialize for ScoreLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Converts a letter rating to its stored score
pub fn encode(rating: LetterRating) -> Score {
    use Modifier::{Negative, Positive, StrongNegative, StrongPositive};

    let value = match (rating.grade, rating.modifier) {
        (C, Some(StrongNegative)) => 0.5,
        (C, Some(Negative)) => 1.0,
        (C, None) => 2.0,
        (C, Some(Positive)) => 3.0,
        (C, Some(StrongPositive)) => 3.5,
        (B, Some(StrongNegative)) => 4.0,
        (B, Some(Negative)) => 4.5,
        (B, None) => 5.5,
        (B, Some(Positive)) => 6.5,
        (B, Some(StrongPositive)) => 7.0,
        (A, Some(StrongNegative)) => 7.5,
        (A, Some(Negative)) => 8.0,
        (A, None) => 9.0,
        (A, Some(Positive)) => 9.5,
        (A, Some(StrongPositive)) => 10.0,
    };
    Score::from_table(value)
}

/// Converts a stored score back to its letter rating
///
/// Only scores produced by [`encode`] are accepted; anything else, including
/// weighted averages, is an [`AppError::UnmappedScore`].
pub fn decode(score: f64) -> AppResult<LetterRating> {
    LetterRating::all()
        .find(|rating| encode(*rating).value() == score)
        .ok_or(AppError::UnmappedScore(score))
}

/// Labels an aggregate score with the highest threshold it reaches
///
/// `None`, zero, negative and NaN scores are "not rated".
pub fn display(score: Option<f64>) -> ScoreLabel {
    let Some(score) = score.filter(|s| *s > 0.0) else {
        return ScoreLabel::NotRated;
    };

    DISPLAY_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, rating)| ScoreLabel::Rated(*rating))
        .unwrap_or(ScoreLabel::NotRated)
}
