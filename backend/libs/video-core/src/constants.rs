//! Feed content constants

/// Default trim window start (seconds into the media file)
pub const DEFAULT_TRIM_START_SECS: f64 = 0.0;

/// Default trim window length (seconds)
pub const DEFAULT_TRIM_DURATION_SECS: f64 = 3.0;

/// Shortest trim window accepted at ingestion; anything shorter falls back
/// to the default duration.
pub const MIN_TRIM_DURATION_SECS: f64 = 0.25;

/// Owner reference used when the upstream record has none
pub const UNKNOWN_OWNER: &str = "unknown";
