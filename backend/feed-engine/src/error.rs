use thiserror::Error;

/// Failure taxonomy of the feed engine.
///
/// None of these are fatal. Components catch them at their boundary and fall
/// back to a degraded state: nothing autoplays, or counts stop updating live.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Retryable: view submission or content refetch failed or timed out
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Expected when the host refuses unmuted autoplay
    #[error("Autoplay rejected for element {0}")]
    AutoplayRejected(String),

    #[error("Observation setup failed for element {element_id}: {reason}")]
    ObservationSetup { element_id: String, reason: String },

    #[error("Media error: {0}")]
    Media(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Item normalization failed: {0}")]
    Normalization(#[from] video_core::NormalizeError),
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::TransientNetwork(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
