//! Merge policy: which fetched fields replace stored ones.
//!
//! Derived fields (`subscriber_count`, `duration`, `view_count`) never regress:
//! once populated they are only ever replaced when the latest item's identity
//! changes. `updated_at` moves only when something else moved.

use crate::cache::{is_blank, CachedEntry, LatestItem};
use crate::source::{ChannelDetails, FetchedItem, ItemDetails};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub entry: CachedEntry,
    pub changed: bool,
}

/// Merges freshly fetched data into `current`.
///
/// `item_details` belongs to `latest` (the fetched item), not to whatever item
/// is currently stored.
pub fn merge(
    current: &CachedEntry,
    details: Option<&ChannelDetails>,
    latest: Option<&FetchedItem>,
    item_details: Option<&ItemDetails>,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut next = current.clone();

    if let Some(details) = details {
        // Adopted once; never refreshed after that
        if is_blank(next.subscriber_count.as_deref())
            && !is_blank(details.subscriber_count.as_deref())
        {
            next.subscriber_count = details.subscriber_count.clone();
        }
    }

    if let Some(latest) = latest.filter(|l| !l.item_id.trim().is_empty()) {
        let same_item = current.latest_item_id() == Some(latest.item_id.as_str());
        if same_item {
            if let (Some(slot), Some(fetched)) = (next.latest_item.as_mut(), item_details) {
                fill_missing_item_details(slot, fetched);
            }
        } else {
            let fetched = item_details.cloned().unwrap_or_default();
            next.latest_item = Some(LatestItem {
                item_id: latest.item_id.clone(),
                title: latest.title.clone(),
                thumbnail_url: latest.thumbnail_url.clone(),
                published_at: latest.published_at,
                duration: fetched.duration,
                view_count: fetched.view_count,
            });
        }
    }

    finish(current, next, now)
}

/// Backfill variant of [`merge`]: same item, only empty derived fields move.
pub fn merge_item_details(
    current: &CachedEntry,
    item_details: &ItemDetails,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut next = current.clone();
    if let Some(slot) = next.latest_item.as_mut() {
        fill_missing_item_details(slot, item_details);
    }
    finish(current, next, now)
}

fn fill_missing_item_details(slot: &mut LatestItem, fetched: &ItemDetails) {
    if slot.is_missing_duration() && !is_blank(fetched.duration.as_deref()) {
        slot.duration = fetched.duration.clone();
    }
    if slot.view_count.is_none() && fetched.view_count.is_some() {
        slot.view_count = fetched.view_count;
    }
}

fn finish(current: &CachedEntry, mut next: CachedEntry, now: DateTime<Utc>) -> MergeOutcome {
    let changed = next != *current;
    if changed {
        next.updated_at = now;
    }
    MergeOutcome {
        entry: next,
        changed,
    }
}
