pub mod consensus;
pub mod grade;
pub mod rating;
pub mod trust_weight;

pub use consensus::{BatchSummary, ConsensusResult, ItemFailure};
pub use grade::{Grade, LetterRating, Modifier};
pub use rating::{Dimension, ItemKey, RatingRecord, Score};
pub use trust_weight::{TrustWeight, TrustWeightEntry, Weight};
