//! Feed surface glue: one instance per mounted feed.
//!
//! content source -> normalization -> rotation sampler -> rendered cards ->
//! playback coordinator -> view ingest, with push updates merged into the
//! shared display counters.

use crate::clients::{ContentQuery, ContentSource, ViewCounter};
use crate::config::{Config, ContentConfig, Surface};
use crate::error::{FeedError, Result};
use crate::services::feed_state::FeedState;
use crate::services::playback::{MediaContainer, PlaybackCoordinator};
use crate::services::rotation::{RotationContext, RotationSampler};
use crate::services::view_ingest::ViewIngestCoordinator;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;
use video_core::{ContentItem, PushUpdate, RawContentItem};

pub struct FeedSurface {
    surface: Surface,
    source: Arc<dyn ContentSource>,
    sampler: RotationSampler,
    context: RwLock<RotationContext>,
    /// Every normalized item fetched so far, newest first
    pool: RwLock<Vec<ContentItem>>,
    ordered: RwLock<Vec<ContentItem>>,
    next_cursor: Mutex<Option<String>>,
    feed_state: Arc<FeedState>,
    playback: PlaybackCoordinator,
    view_ingest: Arc<ViewIngestCoordinator>,
    ingest_task: Mutex<Option<JoinHandle<()>>>,
    content: ContentConfig,
}

impl FeedSurface {
    pub fn new(
        surface: Surface,
        config: &Config,
        source: Arc<dyn ContentSource>,
        counter: Arc<dyn ViewCounter>,
        viewer_id: Option<Uuid>,
    ) -> Result<Self> {
        let context =
            RotationContext::for_viewer(viewer_id, Utc::now(), config.rotation.bucket_hours);
        let feed_state = Arc::new(FeedState::new());
        let playback = PlaybackCoordinator::new(surface, config.playback_for(surface).clone())?;
        let view_ingest = Arc::new(ViewIngestCoordinator::new(
            counter,
            Arc::clone(&feed_state),
            viewer_id,
            config.view_ingest.clone(),
        ));

        Ok(Self {
            surface,
            source,
            sampler: RotationSampler::new(&config.rotation),
            context: RwLock::new(context),
            pool: RwLock::new(Vec::new()),
            ordered: RwLock::new(Vec::new()),
            next_cursor: Mutex::new(None),
            feed_state,
            playback,
            view_ingest,
            ingest_task: Mutex::new(None),
            content: config.content.clone(),
        })
    }

    /// Replace the context, e.g. to restore a surface across remounts
    pub fn with_context(self, context: RotationContext) -> Self {
        *self.context.write() = context;
        self
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn context(&self) -> RotationContext {
        self.context.read().clone()
    }

    pub fn ordered_items(&self) -> Vec<ContentItem> {
        self.ordered.read().clone()
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn feed_state(&self) -> &Arc<FeedState> {
        &self.feed_state
    }

    pub fn view_ingest(&self) -> &Arc<ViewIngestCoordinator> {
        &self.view_ingest
    }

    /// Fetch the first page again and re-sample. On failure the previous
    /// list stays in place.
    pub async fn refresh(&self) -> Result<Vec<ContentItem>> {
        let page = self.fetch_page(None).await?;
        self.feed_state.retain_items(&page);
        *self.pool.write() = page;
        info!(surface = %self.surface, "Feed refreshed");
        Ok(self.resample())
    }

    /// Fetch the next page, append unseen items and re-sample
    pub async fn load_more(&self) -> Result<Vec<ContentItem>> {
        let cursor = self.next_cursor.lock().clone();
        if cursor.is_none() && !self.pool.read().is_empty() {
            debug!(surface = %self.surface, "No further pages");
            return Ok(self.ordered_items());
        }

        let page = self.fetch_page(cursor).await?;
        {
            let mut pool = self.pool.write();
            let mut seen: HashSet<String> = pool.iter().map(|item| item.id.clone()).collect();
            pool.extend(page.into_iter().filter(|item| seen.insert(item.id.clone())));
        }
        Ok(self.resample())
    }

    /// Explicit user reshuffle: new token, same items
    pub fn reshuffle(&self) -> Vec<ContentItem> {
        {
            let mut context = self.context.write();
            *context = self.sampler.force_new_rotation(&context);
        }
        self.resample()
    }

    /// Switch the category filter and refetch for it. On failure the
    /// previous category and list stay in place.
    pub async fn set_category(&self, category: Option<String>) -> Result<Vec<ContentItem>> {
        let previous = std::mem::replace(&mut self.context.write().category, category);
        match self.refresh().await {
            Ok(ordered) => Ok(ordered),
            Err(e) => {
                self.context.write().category = previous;
                Err(e)
            }
        }
    }

    /// Attach playback to the rendered container and start view ingest
    pub async fn mount(&self, container: Arc<dyn MediaContainer>) {
        let events = self.playback.subscribe();
        let task = tokio::spawn(Arc::clone(&self.view_ingest).run(events));
        if let Some(previous) = self.ingest_task.lock().replace(task) {
            previous.abort();
        }
        self.playback.register(container).await;
    }

    pub async fn unmount(&self) {
        self.playback.unregister().await;
        if let Some(task) = self.ingest_task.lock().take() {
            task.abort();
        }
        info!(surface = %self.surface, "Feed surface unmounted");
    }

    /// Merge push updates until the sender side closes
    pub fn spawn_push_listener(&self, mut updates: mpsc::Receiver<PushUpdate>) -> JoinHandle<()> {
        let feed_state = Arc::clone(&self.feed_state);
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                feed_state.apply_push(&update);
            }
            debug!("Push channel closed");
        })
    }

    fn resample(&self) -> Vec<ContentItem> {
        let pool = self.pool.read().clone();
        let context = self.context();

        let ordered = self.sampler.sample_surface(self.surface, pool, &context);

        *self.ordered.write() = ordered.clone();
        ordered
    }

    async fn fetch_page(&self, cursor: Option<String>) -> Result<Vec<ContentItem>> {
        let query = ContentQuery {
            category: self.context.read().category.clone(),
            since: None,
            cursor,
            limit: self.content.page_size,
        };

        let page = match time::timeout(self.content.fetch_timeout, self.source.fetch(&query)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                warn!(surface = %self.surface, error = %e, "Content fetch failed");
                return Err(match e {
                    FeedError::TransientNetwork(_) => e,
                    other => FeedError::TransientNetwork(other.to_string()),
                });
            }
            Err(_) => {
                warn!(surface = %self.surface, "Content fetch timed out");
                return Err(FeedError::TransientNetwork(format!(
                    "content fetch timed out after {:?}",
                    self.content.fetch_timeout
                )));
            }
        };

        *self.next_cursor.lock() = page.next_cursor.clone();
        let items = normalize_page(page.items);
        self.feed_state.seed(&items);
        Ok(items)
    }
}

/// Normalize a fetched page, skipping records that cannot be repaired
pub fn normalize_page(raw: Vec<RawContentItem>) -> Vec<ContentItem> {
    let total = raw.len();
    let items: Vec<ContentItem> = raw
        .into_iter()
        .filter_map(|record| match record.normalize() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %FeedError::from(e), "Dropping malformed item");
                None
            }
        })
        .collect();

    if items.len() < total {
        debug!(kept = items.len(), total = total, "Page normalized with rejects");
    }
    items
}
