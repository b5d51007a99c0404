/// Ranking Module
///
/// Seeded rotation scoring for feed items plus the sponsored-slot
/// interleaving used by the home feed.
pub mod interleave;
pub mod scorer;

pub use interleave::interleave_sponsored;
pub use scorer::{noise, ScoreWeights, Scorer};
