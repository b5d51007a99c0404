use super::session::{Refusal, ViewSession};
use crate::clients::ViewCounter;
use crate::config::ViewIngestConfig;
use crate::error::FeedError;
use crate::models::{PlaybackEvent, ViewOutcome};
use crate::services::feed_state::FeedState;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Submits capped view counts for items whose playback really started
pub struct ViewIngestCoordinator {
    counter: Arc<dyn ViewCounter>,
    feed_state: Arc<FeedState>,
    session: Mutex<ViewSession>,
    viewer_id: Option<Uuid>,
    config: ViewIngestConfig,
}

impl ViewIngestCoordinator {
    pub fn new(
        counter: Arc<dyn ViewCounter>,
        feed_state: Arc<FeedState>,
        viewer_id: Option<Uuid>,
        config: ViewIngestConfig,
    ) -> Self {
        let session = ViewSession::new(config.cap_per_item);
        Self::with_session(counter, feed_state, viewer_id, config, session)
    }

    pub fn with_session(
        counter: Arc<dyn ViewCounter>,
        feed_state: Arc<FeedState>,
        viewer_id: Option<Uuid>,
        config: ViewIngestConfig,
        session: ViewSession,
    ) -> Self {
        Self {
            counter,
            feed_state,
            session: Mutex::new(session),
            viewer_id,
            config,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session.lock().session_id()
    }

    pub fn submitted_count(&self, item_id: &str) -> u32 {
        self.session.lock().submitted_count(item_id)
    }

    /// Handle a confirmed playback start of `item_id`
    pub async fn on_playback_started(&self, item_id: &str) -> ViewOutcome {
        let session_id = {
            let mut session = self.session.lock();
            match session.try_reserve(item_id) {
                Ok(()) => session.session_id(),
                Err(Refusal::CapReached) => {
                    debug!(item_id = %item_id, "View cap reached for session");
                    return ViewOutcome::CapReached;
                }
                Err(Refusal::InFlight) => {
                    debug!(item_id = %item_id, "View submission already in flight");
                    return ViewOutcome::InFlight;
                }
            }
        };

        let call = self.counter.record_view(item_id, session_id, self.viewer_id);
        let result = match time::timeout(self.config.submit_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::TransientNetwork(format!(
                "view submission timed out after {:?}",
                self.config.submit_timeout
            ))),
        };

        match result {
            Ok(record) => {
                self.session.lock().complete(item_id, true);
                self.feed_state
                    .merge_view_count(item_id, record.authoritative_count);
                debug!(
                    item_id = %item_id,
                    is_new_view = record.is_new_view,
                    count = record.authoritative_count,
                    "View recorded"
                );
                ViewOutcome::Submitted(record)
            }
            Err(e) => {
                self.session.lock().complete(item_id, false);
                warn!(
                    item_id = %item_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "View submission failed"
                );
                ViewOutcome::Failed(e.to_string())
            }
        }
    }

    /// Consume playback events until the channel closes
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<PlaybackEvent>) {
        info!(session_id = %self.session_id(), "View ingest started");

        loop {
            match events.recv().await {
                Ok(PlaybackEvent::Started { item_id, .. }) => {
                    // Submissions must not hold up the event stream
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.on_playback_started(&item_id).await;
                    });
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "View ingest lagged behind playback events");
                }
                Err(RecvError::Closed) => break,
            }
        }

        debug!("View ingest stopped");
    }
}
