// ============================================
// Rotation Sampler
// ============================================
//
// Wraps the scorer with session-scoped seeding:
// 1. Session seed = hash(viewer identity, coarse time bucket)
// 2. Effective seed = hash(session seed, reshuffle token)
// 3. The token only changes on an explicit user reshuffle, so a refresh that
//    refetches the same items keeps the same order

use crate::config::{RotationConfig, Surface, MAX_BUCKET_HOURS};
use crate::services::ranking::{interleave_sponsored, ScoreWeights, Scorer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;
use video_core::ContentItem;

const ANONYMOUS_VIEWER: &[u8] = b"anonymous";

/// Per-mount ordering context of a feed surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationContext {
    pub session_seed: u64,
    /// Start of the time bucket the seed was derived from. Recency is measured
    /// against this instant so ordering does not drift while the context lives.
    pub anchor: DateTime<Utc>,
    pub category: Option<String>,
    pub reshuffle_token: u64,
}

impl RotationContext {
    /// Build the context for a viewer at `now`, bucketing time into windows
    /// of `bucket_hours` (clamped to `1..=MAX_BUCKET_HOURS`).
    pub fn for_viewer(viewer_id: Option<Uuid>, now: DateTime<Utc>, bucket_hours: i64) -> Self {
        let bucket_secs = Duration::hours(bucket_hours.clamp(1, MAX_BUCKET_HOURS)).num_seconds();
        let bucket = now.timestamp().div_euclid(bucket_secs);
        let anchor = Utc
            .timestamp_opt(bucket * bucket_secs, 0)
            .single()
            .unwrap_or(now);

        let mut hasher = Sha256::new();
        match viewer_id {
            Some(id) => hasher.update(id.as_bytes()),
            None => hasher.update(ANONYMOUS_VIEWER),
        }
        hasher.update(bucket.to_le_bytes());

        Self {
            session_seed: digest_to_u64(&hasher.finalize()),
            anchor,
            category: None,
            reshuffle_token: 0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Seed handed to the scorer
    pub fn effective_seed(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.session_seed.to_le_bytes());
        hasher.update(self.reshuffle_token.to_le_bytes());
        digest_to_u64(&hasher.finalize())
    }
}

fn digest_to_u64(digest: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(word)
}

pub struct RotationSampler {
    scorer: Scorer,
    max_results: usize,
    boost_cadence: usize,
}

impl RotationSampler {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            scorer: Scorer::new(ScoreWeights::from(config)),
            max_results: config.max_results,
            boost_cadence: config.boost_cadence,
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Order and truncate `items` for the given context.
    ///
    /// Same items + same context always produce the same order.
    pub fn sample(&self, items: Vec<ContentItem>, context: &RotationContext) -> Vec<ContentItem> {
        let input_count = items.len();
        let pool = filter_category(items, context.category.as_deref());

        let ordered: Vec<ContentItem> = self
            .scorer
            .rank(pool, context.effective_seed(), context.anchor)
            .into_iter()
            .take(self.max_results)
            .map(|scored| scored.item)
            .collect();

        debug!(
            input_count = input_count,
            output_count = ordered.len(),
            category = ?context.category,
            "Rotation sampled"
        );

        ordered
    }

    /// Home-feed variant: rank organic and sponsored pools separately, then
    /// interleave sponsored items at the configured cadence.
    pub fn sample_home(
        &self,
        organic: Vec<ContentItem>,
        sponsored: Vec<ContentItem>,
        context: &RotationContext,
    ) -> Vec<ContentItem> {
        let seed = context.effective_seed();
        let category = context.category.as_deref();

        let organic: Vec<ContentItem> = self
            .scorer
            .rank(filter_category(organic, category), seed, context.anchor)
            .into_iter()
            .map(|scored| scored.item)
            .collect();
        let sponsored: Vec<ContentItem> = self
            .scorer
            .rank(filter_category(sponsored, category), seed, context.anchor)
            .into_iter()
            .map(|scored| scored.item)
            .collect();

        let mut merged = interleave_sponsored(organic, sponsored, self.boost_cadence);
        merged.truncate(self.max_results);
        merged
    }

    /// Surface-appropriate ordering: the home feed interleaves sponsored
    /// items, other surfaces rank a single pool
    pub fn sample_surface(
        &self,
        surface: Surface,
        items: Vec<ContentItem>,
        context: &RotationContext,
    ) -> Vec<ContentItem> {
        match surface {
            Surface::Home => {
                let (sponsored, organic): (Vec<_>, Vec<_>) =
                    items.into_iter().partition(|item| item.is_sponsored());
                self.sample_home(organic, sponsored, context)
            }
            Surface::Explore | Surface::Profile => self.sample(items, context),
        }
    }

    /// Return a context whose reshuffle token is freshly randomized
    pub fn force_new_rotation(&self, context: &RotationContext) -> RotationContext {
        let mut token: u64 = rand::random();
        while token == context.reshuffle_token {
            token = rand::random();
        }

        info!(
            category = ?context.category,
            "Forced new feed rotation"
        );

        RotationContext {
            reshuffle_token: token,
            ..context.clone()
        }
    }
}

fn filter_category(items: Vec<ContentItem>, category: Option<&str>) -> Vec<ContentItem> {
    match category {
        Some(wanted) => items
            .into_iter()
            .filter(|item| item.category.as_deref() == Some(wanted))
            .collect(),
        None => items,
    }
}
