//! In-memory display counters for the items of a mounted feed.
//!
//! Counters change only through push updates and authoritative view counts;
//! the `ContentItem` values themselves stay read-only.

use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;
use video_core::{ContentItem, ItemCounters, PushUpdate};

#[derive(Debug, Default)]
pub struct FeedState {
    counters: DashMap<String, ItemCounters>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load counters from freshly fetched items. Known items keep the
    /// larger view count so a stale fetch does not roll back live updates.
    pub fn seed(&self, items: &[ContentItem]) {
        for item in items {
            let fetched = ItemCounters::from(item);
            self.counters
                .entry(item.id.clone())
                .and_modify(|existing| {
                    existing.likes = fetched.likes;
                    existing.comments = fetched.comments;
                    existing.views = existing.views.max(fetched.views);
                })
                .or_insert(fetched);
        }
    }

    /// Drop counters of items that are no longer part of the feed
    pub fn retain_items(&self, items: &[ContentItem]) {
        let keep: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
        let before = self.counters.len();
        self.counters.retain(|id, _| keep.contains(id.as_str()));

        let pruned = before.saturating_sub(self.counters.len());
        if pruned > 0 {
            debug!(pruned = pruned, "Stale item counters pruned");
        }
    }

    /// Merge a partial push update. Likes and comments take the pushed
    /// value; views never move backwards. Updates for items the feed does
    /// not hold are ignored.
    pub fn apply_push(&self, update: &PushUpdate) {
        let Some(mut entry) = self.counters.get_mut(&update.item_id) else {
            debug!(item_id = %update.item_id, "Push update for untracked item ignored");
            return;
        };
        if let Some(likes) = update.like_count {
            entry.likes = likes;
        }
        if let Some(comments) = update.comment_count {
            entry.comments = comments;
        }
        if let Some(views) = update.view_count {
            entry.views = entry.views.max(views);
        }

        debug!(item_id = %update.item_id, counters = ?*entry, "Push update merged");
    }

    /// Merge the count returned by the counting endpoint
    pub fn merge_view_count(&self, item_id: &str, authoritative: u64) {
        let mut entry = self.counters.entry(item_id.to_string()).or_default();
        entry.views = entry.views.max(authoritative);
    }

    pub fn counters(&self, item_id: &str) -> Option<ItemCounters> {
        self.counters.get(item_id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use video_core::TrimWindow;

    fn create_test_item(id: &str, likes: u64, views: u64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            created_at: Utc::now(),
            like_count: likes,
            comment_count: 1,
            view_count: views,
            boost_weight: 0.0,
            media_ref: String::new(),
            trim: TrimWindow::default(),
            owner_ref: "owner".to_string(),
            category: None,
        }
    }

    #[test]
    fn test_partial_push_only_touches_present_fields() {
        let state = FeedState::new();
        state.seed(&[create_test_item("v1", 10, 100)]);

        state.apply_push(&PushUpdate {
            item_id: "v1".to_string(),
            like_count: Some(11),
            ..Default::default()
        });

        let counters = state.counters("v1").unwrap();
        assert_eq!(counters.likes, 11);
        assert_eq!(counters.comments, 1);
        assert_eq!(counters.views, 100);
    }

    #[test]
    fn test_view_count_never_regresses() {
        let state = FeedState::new();
        state.seed(&[create_test_item("v1", 0, 50)]);

        state.merge_view_count("v1", 60);
        state.apply_push(&PushUpdate {
            item_id: "v1".to_string(),
            view_count: Some(55),
            ..Default::default()
        });
        assert_eq!(state.counters("v1").unwrap().views, 60);

        // Refetch with an older snapshot
        state.seed(&[create_test_item("v1", 0, 52)]);
        assert_eq!(state.counters("v1").unwrap().views, 60);
    }

    #[test]
    fn test_push_for_unknown_item_is_ignored() {
        let state = FeedState::new();
        state.seed(&[create_test_item("v1", 1, 1)]);
        state.apply_push(&PushUpdate {
            item_id: "late".to_string(),
            comment_count: Some(4),
            ..Default::default()
        });
        assert!(state.counters("late").is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_retain_items_prunes_dropped_entries() {
        let state = FeedState::new();
        state.seed(&[
            create_test_item("v1", 1, 10),
            create_test_item("v2", 2, 20),
            create_test_item("v3", 3, 30),
        ]);
        state.merge_view_count("v2", 99);

        state.retain_items(&[create_test_item("v2", 2, 20)]);

        assert_eq!(state.len(), 1);
        assert!(state.counters("v1").is_none());
        assert_eq!(state.counters("v2").unwrap().views, 99);
    }
}
