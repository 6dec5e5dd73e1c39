//! Test doubles for the engine's collaborators.
//!
//! - [`MockSourceClient`]: scripted upstream with failure injection, call
//!   counters and in-flight instrumentation
//! - [`CountingStore`]: wraps any [`CacheStore`](crate::cache::CacheStore),
//!   counts accesses and can simulate an unavailable backend

pub mod counting_store;
pub mod mock_source;

pub use counting_store::CountingStore;
pub use mock_source::{MockSourceClient, MockSourceConfig};

use crate::cache::CachedEntry;
use chrono::{TimeZone, Utc};

/// A bare entry (no item, no derived fields) with fixed timestamps.
pub fn sample_entry(entry_id: &str, user_id: &str, source_channel_id: &str) -> CachedEntry {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    CachedEntry {
        entry_id: entry_id.to_string(),
        user_id: user_id.to_string(),
        source_channel_id: source_channel_id.to_string(),
        title: Some(format!("Channel {}", source_channel_id)),
        description: None,
        thumbnail_url: None,
        subscriber_count: None,
        is_featured: false,
        latest_item: None,
        item_count: 0,
        created_at: created,
        updated_at: created,
    }
}
