use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Letter grade of a rating, ordered from lowest to highest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    C,
    B,
    A,
}

impl Grade {
    pub const ALL: [Grade; 3] = [Grade::C, Grade::B, Grade::A];

    fn letter(self) -> char {
        match self {
            Grade::C => 'C',
            Grade::B => 'B',
            Grade::A => 'A',
        }
    }
}

/// Intensity applied on top of a grade. Absence of a modifier means neutral.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    StrongNegative,
    Negative,
    Positive,
    StrongPositive,
}

impl Modifier {
    fn symbol(self) -> &'static str {
        match self {
            Modifier::StrongNegative => "--",
            Modifier::Negative => "-",
            Modifier::Positive => "+",
            Modifier::StrongPositive => "++",
        }
    }
}

/// A user-facing ordinal rating such as `B+` or `A--`
///
/// Ordering follows the rating scale: every `C` sits below every `B`, and
/// within a grade `--` < `-` < neutral < `+` < `++`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LetterRating {
    pub grade: Grade,
    pub modifier: Option<Modifier>,
}

impl LetterRating {
    pub const fn new(grade: Grade, modifier: Option<Modifier>) -> Self {
        Self { grade, modifier }
    }

    /// Position of the modifier on the intensity scale, neutral in the middle
    fn intensity(&self) -> u8 {
        match self.modifier {
            Some(Modifier::StrongNegative) => 0,
            Some(Modifier::Negative) => 1,
            None => 2,
            Some(Modifier::Positive) => 3,
            Some(Modifier::StrongPositive) => 4,
        }
    }

    /// Every grade/modifier combination, lowest first
    pub fn all() -> impl Iterator<Item = LetterRating> {
        Grade::ALL.into_iter().flat_map(|grade| {
            [
                Some(Modifier::StrongNegative),
                Some(Modifier::Negative),
                None,
                Some(Modifier::Positive),
                Some(Modifier::StrongPositive),
            ]
            .into_iter()
            .map(move |modifier| LetterRating::new(grade, modifier))
        })
    }
}

impl PartialOrd for LetterRating {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LetterRating {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.grade, self.intensity()).cmp(&(other.grade, other.intensity()))
    }
}

impl Display for LetterRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.grade.letter())?;
        if let Some(modifier) = self.modifier {
            write!(f, "{}", modifier.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for LetterRating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();

        let grade = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('A') => Grade::A,
            Some('B') => Grade::B,
            Some('C') => Grade::C,
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "Unknown letter rating '{}'",
                    s
                )))
            }
        };

        let modifier = match chars.as_str() {
            "" => None,
            "--" => Some(Modifier::StrongNegative),
            "-" => Some(Modifier::Negative),
            "+" => Some(Modifier::Positive),
            "++" => Some(Modifier::StrongPositive),
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "Unknown rating modifier in '{}'",
                    s
                )))
            }
        };

        Ok(LetterRating { grade, modifier })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_labels() {
        assert_eq!(LetterRating::new(Grade::B, Some(Modifier::Positive)).to_string(), "B+");
        assert_eq!(LetterRating::new(Grade::A, Some(Modifier::StrongNegative)).to_string(), "A--");
        assert_eq!(LetterRating::new(Grade::C, None).to_string(), "C");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let rating: LetterRating = "b++".parse().unwrap();
        assert_eq!(rating, LetterRating::new(Grade::B, Some(Modifier::StrongPositive)));
    }

    #[test]
    fn test_parse_every_label() {
        for rating in LetterRating::all() {
            let parsed: LetterRating = rating.to_string().parse().unwrap();
            assert_eq!(parsed, rating);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_labels() {
        for label in ["", "D", "B+++", "A*", "+"] {
            assert!(matches!(
                label.parse::<LetterRating>(),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_ordering_spans_grade_boundaries() {
        let top_c = LetterRating::new(Grade::C, Some(Modifier::StrongPositive));
        let bottom_b = LetterRating::new(Grade::B, Some(Modifier::StrongNegative));
        assert!(top_c < bottom_b);

        let all: Vec<LetterRating> = LetterRating::all().collect();
        assert_eq!(all.len(), 15);
        assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_modifier_serialization() {
        let json = serde_json::to_string(&Modifier::StrongNegative).unwrap();
        assert_eq!(json, "\"strong_negative\"");
    }
}
