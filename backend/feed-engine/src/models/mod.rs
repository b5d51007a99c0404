use serde::{Deserialize, Serialize};
use video_core::ContentItem;

/// Identifier of a rendered media element inside a scroll container
pub type ElementId = String;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: ContentItem,
    pub score: f64,
    /// Position in the fetched list, used for tie-breaks
    pub fetch_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    /// Not yet registered with a coordinator
    Idle,
    Playing,
    Paused,
}

impl PlayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayState::Idle => "idle",
            PlayState::Playing => "playing",
            PlayState::Paused => "paused",
        }
    }
}

/// Notifications broadcast by the playback coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// play() resolved and the element is the active one
    Started {
        element_id: ElementId,
        item_id: String,
        muted: bool,
    },
    Paused {
        element_id: ElementId,
        item_id: String,
    },
    /// Playback could not start; the element is parked on its first frame
    Degraded {
        element_id: ElementId,
        item_id: String,
        reason: String,
    },
}

/// Response of the counting endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub is_new_view: bool,
    pub authoritative_count: u64,
}

/// Result of a single `on_playback_started` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Submitted(ViewRecord),
    /// The per-session cap for this item is exhausted
    CapReached,
    /// Another submission for this item has not resolved yet
    InFlight,
    /// Submission failed; the counter is unchanged so a later play retries
    Failed(String),
}
