// Pure stages run after collection: normalization and deduplication

pub mod conflation;
pub mod normalize;

pub use conflation::{DedupGroup, Deduplicator, SimilarityConfig};
pub use normalize::{NormalizeConfig, NormalizeOutcome, Normalizer};
