pub mod consensus;
pub mod rating_codec;
pub mod ratings;
pub mod trust_weights;

pub use consensus::{ConsensusEngine, EngineSettings};
