// ============================================
// Rotation Scorer
// ============================================
//
// score = recency(age_hours) + engagement + boost_weight + noise(seed, index)
//
// - recency: linear decay over a fixed horizon, floored at 0
// - engagement: likes + 2 * comments
// - noise: seeded, reproducible jitter in [0, noise_span)

use crate::config::RotationConfig;
use crate::models::ScoredItem;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;
use video_core::ContentItem;

/// Weight constants of the rotation score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub horizon_hours: f64,
    pub like_weight: f64,
    pub comment_weight: f64,
    /// Upper bound (exclusive) of the noise term
    pub noise_span: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::from(&RotationConfig::default())
    }
}

impl From<&RotationConfig> for ScoreWeights {
    fn from(config: &RotationConfig) -> Self {
        Self {
            horizon_hours: config.horizon_hours,
            like_weight: config.like_weight,
            comment_weight: config.comment_weight,
            noise_span: config.noise_span,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score every item and sort descending. Equal scores keep fetch order.
    pub fn rank(&self, items: Vec<ContentItem>, seed: u64, now: DateTime<Utc>) -> Vec<ScoredItem> {
        let mut scored: Vec<ScoredItem> = items
            .into_iter()
            .enumerate()
            .map(|(fetch_index, item)| {
                let score = self.score(&item, fetch_index, seed, now);
                ScoredItem {
                    item,
                    score,
                    fetch_index,
                }
            })
            .collect();

        // Vec::sort_by is stable, so ties stay in fetch order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(count = scored.len(), seed = seed, "Rotation scoring applied");

        scored
    }

    pub fn score(&self, item: &ContentItem, index: usize, seed: u64, now: DateTime<Utc>) -> f64 {
        let age_hours = age_in_hours(item.created_at, now);

        self.recency(age_hours)
            + self.engagement(item)
            + item.boost_weight
            + noise(seed, index, self.weights.noise_span)
    }

    /// Linear decay; items older than the horizon get nothing from this term
    pub fn recency(&self, age_hours: f64) -> f64 {
        (self.weights.horizon_hours - age_hours).max(0.0)
    }

    pub fn engagement(&self, item: &ContentItem) -> f64 {
        self.weights.like_weight * item.like_count as f64
            + self.weights.comment_weight * item.comment_count as f64
    }
}

/// Fractional hours between creation and `now`; future timestamps count as 0
fn age_in_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_seconds = (now - created_at).num_seconds().max(0) as f64;
    age_seconds / 3600.0
}

/// Deterministic jitter in [0, span) derived from `seed` and `index`
pub fn noise(seed: u64, index: usize, span: f64) -> f64 {
    if span <= 0.0 {
        return 0.0;
    }

    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update((index as u64).to_le_bytes());
    let digest = hasher.finalize();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    // Top 53 bits give a uniform f64 in [0, 1)
    let unit = (u64::from_le_bytes(word) >> 11) as f64 / (1u64 << 53) as f64;

    unit * span
}
