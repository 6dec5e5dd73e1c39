//! Read paths over a user's entries.

use super::backfill::Backfill;
use crate::cache::{CacheStore, CachedEntry};
use crate::error::Result;
use crate::source::AccessToken;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::sync::Arc;

pub const DEFAULT_NEW_RELEASES_LIMIT: usize = 20;

pub struct EntryListing {
    store: Arc<dyn CacheStore>,
    backfill: Arc<Backfill>,
    new_releases_limit: usize,
    backfill_concurrency: usize,
}

impl EntryListing {
    pub fn new(
        store: Arc<dyn CacheStore>,
        backfill: Arc<Backfill>,
        new_releases_limit: usize,
        backfill_concurrency: usize,
    ) -> Self {
        Self {
            store,
            backfill,
            new_releases_limit,
            backfill_concurrency: backfill_concurrency.max(1),
        }
    }

    /// Non-featured entries, by title.
    pub async fn list_channels(&self, user_id: &str) -> Result<Vec<CachedEntry>> {
        self.list_by_featured(user_id, false).await
    }

    /// Featured entries, by title.
    pub async fn list_featured(&self, user_id: &str) -> Result<Vec<CachedEntry>> {
        self.list_by_featured(user_id, true).await
    }

    async fn list_by_featured(&self, user_id: &str, featured: bool) -> Result<Vec<CachedEntry>> {
        let mut entries: Vec<CachedEntry> = self
            .store
            .find_by_user(user_id)
            .await?
            .into_iter()
            .filter(|e| e.is_featured == featured)
            .collect();
        entries.sort_by(compare_titles);
        Ok(entries)
    }

    /// Entries with a dated latest item, newest first, each passed through backfill.
    ///
    /// Absent token only disables backfill; the listing itself still succeeds.
    pub async fn list_new_releases(
        &self,
        user_id: &str,
        token: Option<&AccessToken>,
    ) -> Result<Vec<CachedEntry>> {
        let mut entries: Vec<CachedEntry> = self
            .store
            .find_by_user(user_id)
            .await?
            .into_iter()
            .filter(|e| e.latest_item_id().is_some() && e.latest_published_at().is_some())
            .collect();
        entries.sort_by(|a, b| b.latest_published_at().cmp(&a.latest_published_at()));
        entries.truncate(self.new_releases_limit);

        let enriched = stream::iter(entries)
            .map(|entry| self.backfill.backfill_entry(entry, token))
            .buffered(self.backfill_concurrency)
            .collect::<Vec<_>>()
            .await;
        Ok(enriched)
    }
}

/// Missing titles sort last.
fn compare_titles(a: &CachedEntry, b: &CachedEntry) -> Ordering {
    match (a.title.as_deref(), b.title.as_deref()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
