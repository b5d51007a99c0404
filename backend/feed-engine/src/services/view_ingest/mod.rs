// ============================================
// View Ingest Module
// ============================================
//
// Per-session view counting:
// 1. Only playback that actually started produces a submission
// 2. At most N successful submissions per item per session
// 3. One submission in flight per item; failures stay retryable
// 4. Authoritative counts are merged into the feed's display state

pub mod coordinator;
pub mod session;

pub use coordinator::ViewIngestCoordinator;
pub use session::{Refusal, ViewSession};
