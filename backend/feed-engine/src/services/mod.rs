pub mod feed_state;
pub mod playback;
pub mod ranking;
pub mod rotation;
pub mod surface;
pub mod view_ingest;

pub use feed_state::FeedState;
pub use playback::PlaybackCoordinator;
pub use ranking::Scorer;
pub use rotation::{RotationContext, RotationSampler};
pub use surface::FeedSurface;
pub use view_ingest::{ViewIngestCoordinator, ViewSession};
