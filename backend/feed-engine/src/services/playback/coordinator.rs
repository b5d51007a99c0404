// ============================================
// Playback Coordinator
// ============================================
//
// Keeps at most one media element of a scroll container playing:
// 1. Visibility callbacks update per-element ratios
// 2. The hysteresis rule picks the element that should be playing
// 3. Promotion pauses everyone else before play() is attempted
// 4. A per-frame tick rescans the container and clamps the loop window
//
// State sits behind a mutex that is never held across an await. Every
// transition re-reads state after each suspension point; a play() that
// resolves for an element that is no longer tracked (or no longer the
// target) is ignored and the element paused.

use super::media::{MediaContainer, MediaError, MediaSlot};
use super::selection::{select, Selection, Thresholds, VisibilitySample};
use crate::config::{PlaybackConfig, Surface};
use crate::error::{FeedError, Result};
use crate::models::{ElementId, PlayState, PlaybackEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Last reported visibility of a tracked element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityRecord {
    pub ratio: f64,
    pub updated_at: Instant,
}

struct TrackedElement {
    slot: MediaSlot,
    /// Unique per tracking instance; a removed and re-added element gets a
    /// new one, which invalidates in-flight work for the old instance
    epoch: u64,
    visibility: VisibilityRecord,
    state: PlayState,
    muted: bool,
    /// false when observation could not be attached
    observed: bool,
    /// Set after both play attempts failed; cleared by an explicit request
    autoplay_blocked: bool,
    /// Set by a tap-to-pause; cleared by an explicit play or once the
    /// element scrolls below the deactivation threshold
    user_paused: bool,
    play_ticket: u64,
    controls_visible: bool,
    controls_timer: Option<JoinHandle<()>>,
}

impl TrackedElement {
    fn autoplay_eligible(&self) -> bool {
        self.observed && !self.autoplay_blocked && !self.user_paused
    }
}

#[derive(Default)]
struct CoordinatorState {
    container: Option<Arc<dyn MediaContainer>>,
    ticker: Option<JoinHandle<()>>,
    elements: HashMap<ElementId, TrackedElement>,
    /// Tracked element ids in container order
    order: Vec<ElementId>,
    /// The only element allowed to be Playing
    active: Option<ElementId>,
    next_epoch: u64,
    next_ticket: u64,
}

struct Inner {
    surface: Surface,
    config: PlaybackConfig,
    thresholds: Thresholds,
    state: Mutex<CoordinatorState>,
    events: broadcast::Sender<PlaybackEvent>,
}

/// Work collected under the lock and carried out after it is released
struct PromotionPlan {
    slot: MediaSlot,
    epoch: u64,
    ticket: u64,
    muted: bool,
    to_pause: Vec<MediaSlot>,
}

enum PlayOutcome {
    Started { muted: bool },
    Failed(MediaError),
}

#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<Inner>,
}

impl PlaybackCoordinator {
    pub fn new(surface: Surface, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                surface,
                thresholds: Thresholds::from(&config),
                config,
                state: Mutex::new(CoordinatorState::default()),
                events,
            }),
        })
    }

    pub fn surface(&self) -> Surface {
        self.inner.surface
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    /// Start tracking every media element of `container`, including ones
    /// added later. Replaces any previous registration.
    pub async fn register(&self, container: Arc<dyn MediaContainer>) {
        let already_registered = self.inner.state.lock().container.is_some();
        if already_registered {
            self.unregister().await;
        }

        self.inner.state.lock().container = Some(container);
        self.sync_children().await;

        let weak = Arc::downgrade(&self.inner);
        let ticker = tokio::spawn(run_ticker(weak, self.inner.config.tick_interval));
        self.inner.state.lock().ticker = Some(ticker);

        info!(
            surface = %self.inner.surface,
            tracked = self.tracked_count(),
            "Playback coordinator registered"
        );
    }

    /// Stop all tracking and pause every tracked element
    pub async fn unregister(&self) {
        let (ticker, container, elements) = {
            let mut st = self.inner.state.lock();
            st.active = None;
            st.order.clear();
            let elements: Vec<TrackedElement> = st.elements.drain().map(|(_, el)| el).collect();
            (st.ticker.take(), st.container.take(), elements)
        };

        if let Some(ticker) = ticker {
            ticker.abort();
        }

        let count = elements.len();
        for el in elements {
            if let Some(timer) = el.controls_timer {
                timer.abort();
            }
            if let Some(container) = &container {
                container.unobserve(el.slot.element.id());
            }
            pause_quietly(&el.slot);
            if el.state == PlayState::Playing {
                self.emit(PlaybackEvent::Paused {
                    element_id: el.slot.element_id(),
                    item_id: el.slot.item_id.clone(),
                });
            }
        }

        info!(
            surface = %self.inner.surface,
            released = count,
            "Playback coordinator unregistered"
        );
    }

    /// Visibility callback from the host's observer
    pub async fn on_visibility(&self, element_id: &str, ratio: f64) {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };

        if !self.update_visibility(element_id, ratio) {
            // The observer can report an element before the rescan saw it
            self.sync_children().await;
            if !self.update_visibility(element_id, ratio) {
                debug!(element_id = %element_id, "Visibility for untracked element ignored");
                return;
            }
        }

        self.evaluate().await;
    }

    /// Explicit play request (tap). Clears a previous autoplay failure.
    pub async fn request_play(&self, element_id: &str) -> Result<()> {
        if !self.is_tracked(element_id) {
            self.sync_children().await;
        }
        {
            let mut st = self.inner.state.lock();
            let el = st
                .elements
                .get_mut(element_id)
                .ok_or_else(|| FeedError::Media(format!("element {} is not tracked", element_id)))?;
            el.autoplay_blocked = false;
            el.user_paused = false;
        }

        if self.promote(element_id).await {
            self.evaluate().await;
        }
        Ok(())
    }

    /// Explicit pause request (tap). The element stays out of autoplay until
    /// it is played again or scrolled away.
    pub async fn request_pause(&self, element_id: &str) -> Result<()> {
        {
            let mut st = self.inner.state.lock();
            let el = st
                .elements
                .get_mut(element_id)
                .ok_or_else(|| FeedError::Media(format!("element {} is not tracked", element_id)))?;
            el.user_paused = true;
        }
        self.demote(element_id);
        Ok(())
    }

    /// Record a mute preference and apply it; the preference survives
    /// pause/play cycles of the element.
    pub async fn request_mute(&self, element_id: &str, muted: bool) -> Result<()> {
        let slot = {
            let mut st = self.inner.state.lock();
            let el = st
                .elements
                .get_mut(element_id)
                .ok_or_else(|| FeedError::Media(format!("element {} is not tracked", element_id)))?;
            el.muted = muted;
            el.slot.clone()
        };

        slot.element.set_muted(muted);
        debug!(element_id = %element_id, muted = muted, "Mute preference updated");

        self.show_controls(element_id).await;
        Ok(())
    }

    /// Show the element's controls and hide them again after the configured
    /// delay. A repeated call restarts the delay.
    pub async fn show_controls(&self, element_id: &str) {
        let (slot, epoch) = {
            let mut st = self.inner.state.lock();
            let Some(el) = st.elements.get_mut(element_id) else {
                return;
            };
            if let Some(previous) = el.controls_timer.take() {
                previous.abort();
            }
            el.controls_visible = true;
            (el.slot.clone(), el.epoch)
        };

        slot.element.set_controls_visible(true);

        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.config.controls_hide_delay;
        let id = element_id.to_string();
        let timer = tokio::spawn(async move {
            time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let hide = {
                let mut st = inner.state.lock();
                match st.elements.get_mut(&id) {
                    Some(el) if el.epoch == epoch => {
                        el.controls_visible = false;
                        el.controls_timer = None;
                        true
                    }
                    _ => false,
                }
            };
            if hide {
                slot.element.set_controls_visible(false);
            }
        });

        let mut st = self.inner.state.lock();
        match st.elements.get_mut(element_id) {
            Some(el) if el.epoch == epoch => el.controls_timer = Some(timer),
            _ => timer.abort(),
        }
    }

    /// Time-update callback; wraps the active element back into its trim
    /// window. The ticker does the same every frame.
    pub async fn on_time_update(&self, element_id: &str) {
        let slot = {
            let st = self.inner.state.lock();
            if st.active.as_deref() != Some(element_id) {
                return;
            }
            match st.elements.get(element_id) {
                Some(el) if el.state == PlayState::Playing => el.slot.clone(),
                _ => return,
            }
        };
        clamp_loop(&slot);
    }

    pub fn playing(&self) -> Option<ElementId> {
        let st = self.inner.state.lock();
        st.active
            .as_ref()
            .filter(|id| {
                st.elements
                    .get(id.as_str())
                    .map(|el| el.state == PlayState::Playing)
                    .unwrap_or(false)
            })
            .cloned()
    }

    pub fn state_of(&self, element_id: &str) -> PlayState {
        self.inner
            .state
            .lock()
            .elements
            .get(element_id)
            .map(|el| el.state)
            .unwrap_or(PlayState::Idle)
    }

    pub fn is_muted(&self, element_id: &str) -> Option<bool> {
        self.inner.state.lock().elements.get(element_id).map(|el| el.muted)
    }

    pub fn controls_visible(&self, element_id: &str) -> bool {
        self.inner
            .state
            .lock()
            .elements
            .get(element_id)
            .map(|el| el.controls_visible)
            .unwrap_or(false)
    }

    pub fn visibility(&self, element_id: &str) -> Option<VisibilityRecord> {
        self.inner.state.lock().elements.get(element_id).map(|el| el.visibility)
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.state.lock().elements.len()
    }

    pub fn is_tracked(&self, element_id: &str) -> bool {
        self.inner.state.lock().elements.contains_key(element_id)
    }

    /// Number of tracked elements currently in the Playing state
    pub fn playing_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .elements
            .values()
            .filter(|el| el.state == PlayState::Playing)
            .count()
    }

    fn update_visibility(&self, element_id: &str, ratio: f64) -> bool {
        let mut st = self.inner.state.lock();
        match st.elements.get_mut(element_id) {
            Some(el) => {
                el.visibility = VisibilityRecord {
                    ratio,
                    updated_at: Instant::now(),
                };
                if ratio < self.inner.thresholds.deactivation {
                    el.user_paused = false;
                }
                true
            }
            None => false,
        }
    }

    /// Diff the container's current elements against the tracked set
    async fn sync_children(&self) {
        let Some(container) = self.inner.state.lock().container.clone() else {
            return;
        };
        let slots = container.media_slots();
        let present: HashSet<ElementId> = slots.iter().map(|s| s.element_id()).collect();

        let (removed, fresh) = {
            let mut st = self.inner.state.lock();
            // Unregistered while the snapshot was taken
            if st.container.is_none() {
                return;
            }

            let gone: Vec<ElementId> = st
                .elements
                .keys()
                .filter(|id| !present.contains(*id))
                .cloned()
                .collect();
            let mut removed = Vec::with_capacity(gone.len());
            for id in gone {
                if let Some(mut el) = st.elements.remove(&id) {
                    if let Some(timer) = el.controls_timer.take() {
                        timer.abort();
                    }
                    if st.active.as_deref() == Some(id.as_str()) {
                        st.active = None;
                    }
                    removed.push(el);
                }
            }
            if !removed.is_empty() {
                st.order.retain(|id| present.contains(id));
            }

            let fresh: Vec<MediaSlot> = slots
                .iter()
                .filter(|slot| !st.elements.contains_key(slot.element.id()))
                .cloned()
                .collect();
            (removed, fresh)
        };

        // The host observer may call back into the coordinator, so it is
        // attached with the state lock released
        let observed: Vec<(MediaSlot, bool)> = fresh
            .into_iter()
            .map(|slot| {
                let ok = match container.observe(&slot) {
                    Ok(()) => true,
                    Err(e) => {
                        let err = FeedError::ObservationSetup {
                            element_id: slot.element_id(),
                            reason: e.to_string(),
                        };
                        warn!(error = %err, "Element excluded from autoplay");
                        false
                    }
                };
                (slot, ok)
            })
            .collect();

        let (added, orphaned) = {
            let mut st = self.inner.state.lock();
            let same_container = st
                .container
                .as_ref()
                .map(|current| Arc::ptr_eq(current, &container))
                .unwrap_or(false);

            if !same_container {
                (0, observed)
            } else {
                let mut added = 0usize;
                for (slot, observed) in observed {
                    let id = slot.element_id();
                    // A concurrent rescan got there first
                    if st.elements.contains_key(&id) {
                        continue;
                    }
                    st.next_epoch += 1;
                    let epoch = st.next_epoch;
                    st.elements.insert(
                        id,
                        TrackedElement {
                            slot,
                            epoch,
                            visibility: VisibilityRecord {
                                ratio: 0.0,
                                updated_at: Instant::now(),
                            },
                            state: PlayState::Paused,
                            muted: false,
                            observed,
                            autoplay_blocked: false,
                            user_paused: false,
                            play_ticket: 0,
                            controls_visible: false,
                            controls_timer: None,
                        },
                    );
                    added += 1;
                }

                if added > 0 {
                    let order: Vec<ElementId> = slots
                        .iter()
                        .map(|s| s.element_id())
                        .filter(|id| st.elements.contains_key(id))
                        .collect();
                    st.order = order;
                }
                (added, Vec::new())
            }
        };

        // Registration changed while observers were being attached
        for (slot, _) in &orphaned {
            container.unobserve(slot.element.id());
        }

        if removed.is_empty() && added == 0 {
            return;
        }

        for el in &removed {
            container.unobserve(el.slot.element.id());
            if el.state == PlayState::Playing {
                pause_quietly(&el.slot);
                self.emit(PlaybackEvent::Paused {
                    element_id: el.slot.element_id(),
                    item_id: el.slot.item_id.clone(),
                });
            }
        }

        debug!(
            surface = %self.inner.surface,
            added = added,
            removed = removed.len(),
            "Container elements resynced"
        );

        self.evaluate().await;
    }

    /// Apply the selection rule until it settles. A promotion that degrades
    /// leaves nothing playing, so the rule runs again without that element.
    async fn evaluate(&self) {
        loop {
            let selection = {
                let st = self.inner.state.lock();
                let samples: Vec<VisibilitySample> = st
                    .order
                    .iter()
                    .filter_map(|id| st.elements.get(id))
                    .map(|el| VisibilitySample {
                        element_id: el.slot.element_id(),
                        ratio: el.visibility.ratio,
                        autoplay: el.autoplay_eligible(),
                    })
                    .collect();
                let current = st.active.as_deref().filter(|id| {
                    st.elements
                        .get(*id)
                        .map(|el| el.state == PlayState::Playing)
                        .unwrap_or(false)
                });
                select(&samples, current, self.inner.thresholds)
            };

            match selection {
                Selection::Keep => return,
                Selection::Demote(id) => {
                    self.demote(&id);
                    return;
                }
                Selection::Promote(id) => {
                    if !self.promote(&id).await {
                        return;
                    }
                }
            }
        }
    }

    fn demote(&self, element_id: &str) {
        let slot = {
            let mut st = self.inner.state.lock();
            if st.active.as_deref() == Some(element_id) {
                st.active = None;
            }
            match st.elements.get_mut(element_id) {
                Some(el) if el.state == PlayState::Playing => {
                    el.state = PlayState::Paused;
                    // Invalidate a play() still in flight
                    el.play_ticket = 0;
                    el.slot.clone()
                }
                _ => return,
            }
        };

        pause_quietly(&slot);
        debug!(element_id = %element_id, "Playback demoted");
        self.emit(PlaybackEvent::Paused {
            element_id: slot.element_id(),
            item_id: slot.item_id.clone(),
        });
    }

    /// Returns true when the element degraded and nothing is playing
    async fn promote(&self, element_id: &str) -> bool {
        let Some(plan) = self.plan_promotion(element_id) else {
            return false;
        };

        for other in &plan.to_pause {
            pause_quietly(other);
            self.emit(PlaybackEvent::Paused {
                element_id: other.element_id(),
                item_id: other.item_id.clone(),
            });
        }

        let element = plan.slot.element.clone();
        if !plan.slot.trim.contains(element.current_time()) {
            element.set_current_time(plan.slot.trim.start);
        }

        element.set_muted(plan.muted);
        let outcome = match element.play().await {
            Ok(()) => PlayOutcome::Started { muted: plan.muted },
            Err(e) if !plan.muted => {
                debug!(element_id = %element_id, error = %e, "Play rejected, retrying muted");
                if !self.still_current(element_id, plan.epoch, plan.ticket) {
                    self.discard_stale(element_id, &plan.slot);
                    return false;
                }
                element.set_muted(true);
                match element.play().await {
                    Ok(()) => PlayOutcome::Started { muted: true },
                    Err(e) => PlayOutcome::Failed(e),
                }
            }
            Err(e) => PlayOutcome::Failed(e),
        };

        self.settle_promotion(element_id, plan, outcome)
    }

    /// Claim the active slot for `element_id` and collect the elements that
    /// must pause first
    fn plan_promotion(&self, element_id: &str) -> Option<PromotionPlan> {
        let mut st = self.inner.state.lock();

        let already_playing = st.active.as_deref() == Some(element_id)
            && st
                .elements
                .get(element_id)
                .map(|el| el.state == PlayState::Playing)
                .unwrap_or(false);
        if already_playing || !st.elements.contains_key(element_id) {
            return None;
        }

        let mut to_pause = Vec::new();
        for (id, el) in st.elements.iter_mut() {
            if id != element_id && el.state == PlayState::Playing {
                el.state = PlayState::Paused;
                el.play_ticket = 0;
                to_pause.push(el.slot.clone());
            }
        }

        st.next_ticket += 1;
        let ticket = st.next_ticket;
        st.active = Some(element_id.to_string());

        let el = st.elements.get_mut(element_id)?;
        el.state = PlayState::Playing;
        el.play_ticket = ticket;

        Some(PromotionPlan {
            slot: el.slot.clone(),
            epoch: el.epoch,
            ticket,
            muted: el.muted,
            to_pause,
        })
    }

    fn settle_promotion(&self, element_id: &str, plan: PromotionPlan, outcome: PlayOutcome) -> bool {
        let settled = {
            let mut st = self.inner.state.lock();
            let current = st.active.as_deref() == Some(element_id);
            match st
                .elements
                .get_mut(element_id)
                .filter(|el| current && el.epoch == plan.epoch && el.play_ticket == plan.ticket)
            {
                None => None,
                Some(el) => match outcome {
                    PlayOutcome::Started { muted } => {
                        el.muted = muted;
                        Some(PlaybackEvent::Started {
                            element_id: element_id.to_string(),
                            item_id: plan.slot.item_id.clone(),
                            muted,
                        })
                    }
                    PlayOutcome::Failed(e) => {
                        el.state = PlayState::Paused;
                        el.play_ticket = 0;
                        el.autoplay_blocked = true;
                        st.active = None;
                        let reason = match e {
                            MediaError::AutoplayRejected => {
                                FeedError::AutoplayRejected(element_id.to_string())
                            }
                            other => FeedError::Media(other.to_string()),
                        };
                        Some(PlaybackEvent::Degraded {
                            element_id: element_id.to_string(),
                            item_id: plan.slot.item_id.clone(),
                            reason: reason.to_string(),
                        })
                    }
                },
            }
        };

        let Some(event) = settled else {
            self.discard_stale(element_id, &plan.slot);
            return false;
        };

        let degraded = match &event {
            PlaybackEvent::Started { muted, .. } => {
                debug!(element_id = %element_id, muted = *muted, "Playback started");
                false
            }
            PlaybackEvent::Degraded { reason, .. } => {
                // Park on the first frame of the trim window
                plan.slot.element.set_current_time(plan.slot.trim.start);
                pause_quietly(&plan.slot);
                warn!(element_id = %element_id, reason = %reason, "Playback degraded to paused");
                true
            }
            PlaybackEvent::Paused { .. } => false,
        };

        self.emit(event);
        degraded
    }

    fn still_current(&self, element_id: &str, epoch: u64, ticket: u64) -> bool {
        let st = self.inner.state.lock();
        st.active.as_deref() == Some(element_id)
            && st
                .elements
                .get(element_id)
                .map(|el| el.epoch == epoch && el.play_ticket == ticket)
                .unwrap_or(false)
    }

    /// Drop the result of a superseded play(). The element is paused unless
    /// a newer promotion made it the active one again.
    fn discard_stale(&self, element_id: &str, slot: &MediaSlot) {
        let reclaimed = self.inner.state.lock().active.as_deref() == Some(element_id);
        debug!(element_id = %element_id, reclaimed = reclaimed, "Stale play resolution ignored");
        if !reclaimed {
            pause_quietly(slot);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    async fn tick(&self) {
        self.sync_children().await;

        let active = {
            let st = self.inner.state.lock();
            st.active
                .as_ref()
                .and_then(|id| st.elements.get(id))
                .filter(|el| el.state == PlayState::Playing)
                .map(|el| el.slot.clone())
        };
        if let Some(slot) = active {
            clamp_loop(&slot);
        }
    }
}

async fn run_ticker(weak: Weak<Inner>, period: std::time::Duration) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        PlaybackCoordinator { inner }.tick().await;
    }
}

/// Reset to the trim start once the end of the window is reached
fn clamp_loop(slot: &MediaSlot) {
    let now = slot.element.current_time();
    if now >= slot.trim.end() {
        slot.element.set_current_time(slot.trim.start);
        debug!(
            element_id = %slot.element.id(),
            from = now,
            to = slot.trim.start,
            "Loop window wrapped"
        );
    }
}

fn pause_quietly(slot: &MediaSlot) {
    match slot.element.pause() {
        Ok(()) => {}
        Err(MediaError::Detached) => {
            debug!(element_id = %slot.element.id(), "Pause skipped for detached element");
        }
        Err(e) => {
            warn!(element_id = %slot.element.id(), error = %e, "Pause failed");
        }
    }
}
