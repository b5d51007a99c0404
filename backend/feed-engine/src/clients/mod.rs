//! Boundaries to the external collaborators of the feed engine: the content
//! store and the view counting endpoint.

use crate::error::Result;
use crate::models::ViewRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use video_core::RawContentItem;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentQuery {
    pub category: Option<String>,
    /// Only items created at or after this instant
    pub since: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPage {
    /// Newest first
    pub items: Vec<RawContentItem>,
    pub next_cursor: Option<String>,
}

/// Content store query interface
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, query: &ContentQuery) -> Result<ContentPage>;
}

/// Atomic view counting procedure on the server
#[async_trait]
pub trait ViewCounter: Send + Sync {
    async fn record_view(
        &self,
        item_id: &str,
        session_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<ViewRecord>;
}
