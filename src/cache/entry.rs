use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's subscription to one external channel, with cached display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry {
    pub entry_id: String,
    pub user_id: String,
    pub source_channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub latest_item: Option<LatestItem>,
    /// Advisory only; never derived from upstream data
    #[serde(default)]
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-slot cache of the channel's most recent item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestItem {
    pub item_id: String,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub view_count: Option<u64>,
}

impl LatestItem {
    pub fn is_missing_duration(&self) -> bool {
        is_blank(self.duration.as_deref())
    }

    pub fn is_missing_view_count(&self) -> bool {
        self.view_count.is_none()
    }

    pub fn needs_details(&self) -> bool {
        self.is_missing_duration() || self.is_missing_view_count()
    }
}

impl CachedEntry {
    /// Identity of the cached latest item, if there is a usable one.
    pub fn latest_item_id(&self) -> Option<&str> {
        self.latest_item
            .as_ref()
            .map(|item| item.item_id.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    pub fn latest_published_at(&self) -> Option<DateTime<Utc>> {
        self.latest_item.as_ref().and_then(|item| item.published_at)
    }
}

/// `None`, empty and whitespace-only all count as "no value".
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
