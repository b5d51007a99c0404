// ============================================
// Synchronized Playback Module
// ============================================
//
// Single-active-player autoplay for a scrolling feed:
// - media: host contracts for video elements and the scroll container
// - selection: the pure hysteresis rule
// - coordinator: state machine, container tracking, loop-window clamping

pub mod coordinator;
pub mod media;
pub mod selection;

pub use coordinator::{PlaybackCoordinator, VisibilityRecord};
pub use media::{MediaContainer, MediaElement, MediaError, MediaSlot};
pub use selection::{select, Selection, Thresholds, VisibilitySample};
