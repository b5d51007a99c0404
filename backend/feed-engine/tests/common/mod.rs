#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feed_engine::clients::{ContentPage, ContentQuery, ContentSource, ViewCounter};
use feed_engine::config::PlaybackConfig;
use feed_engine::models::ViewRecord;
use feed_engine::services::playback::{MediaContainer, MediaElement, MediaError, MediaSlot};
use feed_engine::{FeedError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use video_core::{ContentItem, RawContentItem, TrimWindow};

// ---------- media ----------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayBehavior {
    Accept,
    /// Host refuses unmuted autoplay
    RejectUnmuted,
    RejectAlways,
    Delay(Duration),
}

#[derive(Debug)]
struct FakeMediaState {
    playing: bool,
    muted: bool,
    current_time: f64,
    controls_visible: bool,
    behavior: PlayBehavior,
    play_calls: u32,
}

pub struct FakeMedia {
    id: String,
    state: Mutex<FakeMediaState>,
}

impl FakeMedia {
    pub fn new(id: &str) -> Arc<Self> {
        Self::with_behavior(id, PlayBehavior::Accept)
    }

    pub fn with_behavior(id: &str, behavior: PlayBehavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            state: Mutex::new(FakeMediaState {
                playing: false,
                muted: false,
                current_time: 0.0,
                controls_visible: false,
                behavior,
                play_calls: 0,
            }),
        })
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn time(&self) -> f64 {
        self.state.lock().current_time
    }

    pub fn seek(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    pub fn controls_visible(&self) -> bool {
        self.state.lock().controls_visible
    }

    pub fn play_calls(&self) -> u32 {
        self.state.lock().play_calls
    }

    pub fn set_behavior(&self, behavior: PlayBehavior) {
        self.state.lock().behavior = behavior;
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn id(&self) -> &str {
        &self.id
    }

    async fn play(&self) -> std::result::Result<(), MediaError> {
        let (behavior, muted) = {
            let mut s = self.state.lock();
            s.play_calls += 1;
            (s.behavior, s.muted)
        };

        match behavior {
            PlayBehavior::Accept => {}
            PlayBehavior::RejectUnmuted if !muted => return Err(MediaError::AutoplayRejected),
            PlayBehavior::RejectUnmuted => {}
            PlayBehavior::RejectAlways => return Err(MediaError::AutoplayRejected),
            PlayBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }

        self.state.lock().playing = true;
        Ok(())
    }

    fn pause(&self) -> std::result::Result<(), MediaError> {
        self.state.lock().playing = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    fn duration(&self) -> Option<f64> {
        Some(30.0)
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_controls_visible(&self, visible: bool) {
        self.state.lock().controls_visible = visible;
    }
}

#[derive(Default)]
pub struct FakeContainer {
    slots: Mutex<Vec<MediaSlot>>,
    failing_observers: Mutex<HashSet<String>>,
    unobserved: Mutex<Vec<String>>,
}

impl FakeContainer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_media(media: &[Arc<FakeMedia>]) -> Arc<Self> {
        let container = Self::new();
        for m in media {
            container.push(m, TrimWindow::default());
        }
        container
    }

    pub fn push(&self, media: &Arc<FakeMedia>, trim: TrimWindow) {
        let item_id = format!("item-{}", media.id());
        self.push_item(media, &item_id, trim);
    }

    /// Render a card for a specific feed item
    pub fn push_item(&self, media: &Arc<FakeMedia>, item_id: &str, trim: TrimWindow) {
        let element: Arc<dyn MediaElement> = media.clone();
        self.slots.lock().push(MediaSlot::new(element, item_id.to_string(), trim));
    }

    pub fn remove(&self, element_id: &str) {
        self.slots.lock().retain(|slot| slot.element.id() != element_id);
    }

    pub fn fail_observe(&self, element_id: &str) {
        self.failing_observers.lock().insert(element_id.to_string());
    }

    pub fn unobserved(&self) -> Vec<String> {
        self.unobserved.lock().clone()
    }
}

impl MediaContainer for FakeContainer {
    fn media_slots(&self) -> Vec<MediaSlot> {
        self.slots.lock().clone()
    }

    fn observe(&self, slot: &MediaSlot) -> std::result::Result<(), MediaError> {
        if self.failing_observers.lock().contains(slot.element.id()) {
            return Err(MediaError::Failed("observer unavailable".to_string()));
        }
        Ok(())
    }

    fn unobserve(&self, element_id: &str) {
        self.unobserved.lock().push(element_id.to_string());
    }
}

pub fn fake_media_set(count: usize) -> Vec<Arc<FakeMedia>> {
    (0..count).map(|i| FakeMedia::new(&format!("e{}", i))).collect()
}

pub fn fast_playback_config() -> PlaybackConfig {
    PlaybackConfig {
        tick_interval: Duration::from_millis(16),
        controls_hide_delay: Duration::from_millis(2500),
        ..PlaybackConfig::default()
    }
}

// ---------- network collaborators ----------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterBehavior {
    Succeed,
    Fail,
    Hang,
    Delay(Duration),
}

pub struct FakeViewCounter {
    calls: AtomicU32,
    behavior: Mutex<CounterBehavior>,
    base_count: u64,
    pub last_session: Mutex<Option<Uuid>>,
    pub last_viewer: Mutex<Option<Uuid>>,
}

impl FakeViewCounter {
    pub fn new(behavior: CounterBehavior) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            behavior: Mutex::new(behavior),
            base_count: 1_000,
            last_session: Mutex::new(None),
            last_viewer: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, behavior: CounterBehavior) {
        *self.behavior.lock() = behavior;
    }
}

#[async_trait]
impl ViewCounter for FakeViewCounter {
    async fn record_view(
        &self,
        _item_id: &str,
        session_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<ViewRecord> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_session.lock() = Some(session_id);
        *self.last_viewer.lock() = viewer_id;

        let behavior = *self.behavior.lock();
        match behavior {
            CounterBehavior::Succeed => {}
            CounterBehavior::Fail => {
                return Err(FeedError::TransientNetwork("connection reset".to_string()))
            }
            CounterBehavior::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
            CounterBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }

        Ok(ViewRecord {
            is_new_view: call == 1,
            authoritative_count: self.base_count + call as u64,
        })
    }
}

pub struct FakeContentSource {
    pages: Mutex<Vec<ContentPage>>,
    failing: Mutex<bool>,
    pub queries: Mutex<Vec<ContentQuery>>,
}

impl FakeContentSource {
    /// Pages are served by cursor: no cursor -> page 0, "p1" -> page 1, …
    pub fn new(pages: Vec<ContentPage>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages),
            failing: Mutex::new(false),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn set_pages(&self, pages: Vec<ContentPage>) {
        *self.pages.lock() = pages;
    }
}

#[async_trait]
impl ContentSource for FakeContentSource {
    async fn fetch(&self, query: &ContentQuery) -> Result<ContentPage> {
        self.queries.lock().push(query.clone());
        if *self.failing.lock() {
            return Err(FeedError::TransientNetwork("503 from content store".to_string()));
        }

        let index = match query.cursor.as_deref() {
            None => 0,
            Some(cursor) => cursor.trim_start_matches('p').parse::<usize>().unwrap_or(0),
        };
        let mut page = self.pages.lock().get(index).cloned().unwrap_or_default();
        if let Some(category) = query.category.as_deref() {
            page.items.retain(|item| item.category.as_deref() == Some(category));
        }
        Ok(page)
    }
}

// ---------- items ----------

pub fn item_at(id: &str, created_at: DateTime<Utc>, likes: u64, comments: u64) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        created_at,
        like_count: likes,
        comment_count: comments,
        view_count: 0,
        boost_weight: 0.0,
        media_ref: format!("s3://media/{}.mp4", id),
        trim: TrimWindow::default(),
        owner_ref: "owner-1".to_string(),
        category: None,
    }
}

pub fn raw_item(id: &str, age_hours: i64, likes: i64) -> RawContentItem {
    RawContentItem {
        id: Some(id.to_string()),
        created_at: Some((Utc::now() - ChronoDuration::hours(age_hours)).to_rfc3339()),
        like_count: Some(likes),
        media_ref: Some(format!("s3://media/{}.mp4", id)),
        owner_ref: Some("owner-1".to_string()),
        ..Default::default()
    }
}
