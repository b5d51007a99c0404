//! Host-side media contracts consumed by the playback coordinator.
//!
//! The coordinator never touches a rendering toolkit directly; the host
//! implements these traits for its video elements and scroll container.

use crate::models::ElementId;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use video_core::TrimWindow;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    /// Host autoplay policy refused playback (usually unmuted playback)
    #[error("Autoplay rejected")]
    AutoplayRejected,

    /// The element is no longer attached to the document
    #[error("Element detached")]
    Detached,

    #[error("Media operation failed: {0}")]
    Failed(String),
}

/// A rendered video element
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn id(&self) -> &str;

    /// Start playback. May be rejected by the host's autoplay policy.
    async fn play(&self) -> Result<(), MediaError>;

    fn pause(&self) -> Result<(), MediaError>;

    /// Seconds from the start of the media file
    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    /// Total length of the media, when known
    fn duration(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);

    fn set_controls_visible(&self, _visible: bool) {}
}

/// One media element of the container together with the item it renders
#[derive(Clone)]
pub struct MediaSlot {
    pub element: Arc<dyn MediaElement>,
    pub item_id: String,
    pub trim: TrimWindow,
}

impl MediaSlot {
    pub fn new(element: Arc<dyn MediaElement>, item_id: impl Into<String>, trim: TrimWindow) -> Self {
        Self {
            element,
            item_id: item_id.into(),
            trim,
        }
    }

    pub fn element_id(&self) -> ElementId {
        self.element.id().to_string()
    }
}

impl fmt::Debug for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSlot")
            .field("element_id", &self.element.id())
            .field("item_id", &self.item_id)
            .field("trim", &self.trim)
            .finish()
    }
}

/// The scroll container the coordinator attaches to
pub trait MediaContainer: Send + Sync {
    /// Media elements currently in the document, in display order
    fn media_slots(&self) -> Vec<MediaSlot>;

    /// Attach visibility observation to an element. A failure leaves the
    /// element tracked but excluded from autoplay.
    fn observe(&self, _slot: &MediaSlot) -> Result<(), MediaError> {
        Ok(())
    }

    fn unobserve(&self, _element_id: &str) {}
}
