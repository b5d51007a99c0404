//! Core feed content models

use crate::constants::{
    DEFAULT_TRIM_DURATION_SECS, DEFAULT_TRIM_START_SECS, MIN_TRIM_DURATION_SECS, UNKNOWN_OWNER,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Playable highlight segment of a media file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: f64,    // seconds
    pub duration: f64, // seconds
}

impl TrimWindow {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// Time at which playback wraps back to `start`
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self {
            start: DEFAULT_TRIM_START_SECS,
            duration: DEFAULT_TRIM_DURATION_SECS,
        }
    }
}

/// Normalized feed item. Every counter is non-null; the ranking and playback
/// code never sees upstream schema variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    /// Sponsor priority, 0 for organic content
    pub boost_weight: f64,
    pub media_ref: String,
    pub trim: TrimWindow,
    pub owner_ref: String,
    pub category: Option<String>,
}

impl ContentItem {
    pub fn is_sponsored(&self) -> bool {
        self.boost_weight > 0.0
    }
}

/// Item shape as delivered by the content source. Counters and trim metadata
/// may be missing or null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContentItem {
    pub id: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "likeCount", alias = "likes")]
    pub like_count: Option<i64>,
    #[serde(default, alias = "commentCount", alias = "comments")]
    pub comment_count: Option<i64>,
    #[serde(default, alias = "viewCount", alias = "views")]
    pub view_count: Option<i64>,
    #[serde(default, alias = "boostWeight")]
    pub boost_weight: Option<f64>,
    #[serde(default, alias = "mediaRef", alias = "videoUrl")]
    pub media_ref: Option<String>,
    #[serde(default, alias = "trimStart")]
    pub trim_start: Option<f64>,
    #[serde(default, alias = "trimDuration")]
    pub trim_duration: Option<f64>,
    #[serde(default, alias = "ownerRef", alias = "userId")]
    pub owner_ref: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Item is missing an id")]
    MissingId,

    #[error("Item {id} has an invalid created_at: {value}")]
    InvalidTimestamp { id: String, value: String },
}

impl RawContentItem {
    /// Convert into a `ContentItem`, defaulting absent counters to zero.
    ///
    /// Only a missing id or an unparsable timestamp rejects the item; every
    /// other gap is filled and noted at debug level.
    pub fn normalize(self) -> Result<ContentItem, NormalizeError> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(NormalizeError::MissingId),
        };

        let created_at = match self.created_at.as_deref() {
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| NormalizeError::InvalidTimestamp {
                    id: id.clone(),
                    value: value.to_string(),
                })?,
            None => {
                return Err(NormalizeError::InvalidTimestamp {
                    id,
                    value: String::new(),
                })
            }
        };

        let mut defaulted: Vec<&'static str> = Vec::new();
        let like_count = count_or_zero(self.like_count, "like_count", &mut defaulted);
        let comment_count = count_or_zero(self.comment_count, "comment_count", &mut defaulted);
        let view_count = count_or_zero(self.view_count, "view_count", &mut defaulted);

        let boost_weight = match self.boost_weight {
            Some(w) if w.is_finite() && w >= 0.0 => w,
            _ => {
                defaulted.push("boost_weight");
                0.0
            }
        };

        let trim_start = match self.trim_start {
            Some(s) if s.is_finite() && s >= 0.0 => s,
            _ => {
                defaulted.push("trim_start");
                DEFAULT_TRIM_START_SECS
            }
        };
        let trim_duration = match self.trim_duration {
            Some(d) if d.is_finite() && d >= MIN_TRIM_DURATION_SECS => d,
            _ => {
                defaulted.push("trim_duration");
                DEFAULT_TRIM_DURATION_SECS
            }
        };

        let owner_ref = self.owner_ref.unwrap_or_else(|| {
            defaulted.push("owner_ref");
            UNKNOWN_OWNER.to_string()
        });

        if !defaulted.is_empty() {
            debug!(item_id = %id, fields = ?defaulted, "Defaulted missing item fields");
        }

        Ok(ContentItem {
            media_ref: self.media_ref.unwrap_or_default(),
            id,
            created_at,
            like_count,
            comment_count,
            view_count,
            boost_weight,
            trim: TrimWindow::new(trim_start, trim_duration),
            owner_ref,
            category: self.category.filter(|c| !c.is_empty()),
        })
    }
}

fn count_or_zero(value: Option<i64>, field: &'static str, defaulted: &mut Vec<&'static str>) -> u64 {
    match value {
        Some(v) if v >= 0 => v as u64,
        _ => {
            defaulted.push(field);
            0
        }
    }
}

/// Partial counter update from the push channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushUpdate {
    #[serde(alias = "itemId")]
    pub item_id: String,
    #[serde(default, alias = "likeCount")]
    pub like_count: Option<u64>,
    #[serde(default, alias = "commentCount")]
    pub comment_count: Option<u64>,
    #[serde(default, alias = "viewCount")]
    pub view_count: Option<u64>,
}

/// Display-state counters for a single item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounters {
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
}

impl From<&ContentItem> for ItemCounters {
    fn from(item: &ContentItem) -> Self {
        Self {
            likes: item.like_count,
            comments: item.comment_count,
            views: item.view_count,
        }
    }
}
