//! Read-time enrichment of a single entry.
//!
//! Runs inside listing calls, so it never fails: whatever goes wrong, the
//! caller gets an entry back (the original one if nothing could be improved).

use super::merge::merge_item_details;
use crate::cache::{CacheStore, CachedEntry};
use crate::error::Result;
use crate::source::{AccessToken, SourceClient};
use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

pub struct Backfill {
    source: Arc<dyn SourceClient>,
    store: Arc<dyn CacheStore>,
}

impl Backfill {
    pub fn new(source: Arc<dyn SourceClient>, store: Arc<dyn CacheStore>) -> Self {
        Self { source, store }
    }

    pub async fn backfill_entry(&self, entry: CachedEntry, token: Option<&AccessToken>) -> CachedEntry {
        let Some(token) = token else {
            return entry;
        };
        let Some(item_id) = entry
            .latest_item
            .as_ref()
            .filter(|item| item.needs_details())
            .and_then(|_| entry.latest_item_id())
            .map(str::to_string)
        else {
            return entry;
        };

        match self.try_backfill(&entry, token, &item_id).await {
            Ok(Some(enriched)) => enriched,
            Ok(None) => entry,
            Err(e) => {
                warn!(
                    "Backfill of entry {} (item {}) failed, serving cached copy: {}",
                    entry.entry_id, item_id, e
                );
                entry
            }
        }
    }

    async fn try_backfill(
        &self,
        entry: &CachedEntry,
        token: &AccessToken,
        item_id: &str,
    ) -> Result<Option<CachedEntry>> {
        let Some(details) = self.source.fetch_item_details(token, item_id).await? else {
            debug!("No item details upstream for {}", item_id);
            return Ok(None);
        };

        let outcome = merge_item_details(entry, &details, Utc::now());
        if !outcome.changed {
            return Ok(None);
        }
        let saved = self.store.upsert(outcome.entry).await?;
        debug!("Backfilled entry {} (item {})", saved.entry_id, item_id);
        Ok(Some(saved))
    }
}
