//! Bulk refresh of one user's entries under a fixed concurrency width.
//!
//! Each entry costs up to three metered upstream calls (channel details and
//! latest item in parallel, then item details when needed). At most
//! `concurrency` entries have calls outstanding at any moment.

use super::merge::merge;
use crate::cache::{CacheStore, CachedEntry};
use crate::error::{ErrorKind, Result, SyncError};
use crate::source::{AccessToken, SourceClient};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_REFRESH_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub ok: bool,
    pub error_kind: Option<ErrorKind>,
    pub checked: usize,
    pub updated: usize,
}

impl RefreshResult {
    fn completed(checked: usize, updated: usize) -> Self {
        Self {
            ok: true,
            error_kind: None,
            checked,
            updated,
        }
    }

    fn failed(kind: ErrorKind) -> Self {
        Self {
            ok: false,
            error_kind: Some(kind),
            checked: 0,
            updated: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Updated,
    Unchanged,
    Skipped,
}

pub struct RefreshOrchestrator {
    source: Arc<dyn SourceClient>,
    store: Arc<dyn CacheStore>,
    concurrency: usize,
}

impl RefreshOrchestrator {
    pub fn new(source: Arc<dyn SourceClient>, store: Arc<dyn CacheStore>, concurrency: usize) -> Self {
        Self {
            source,
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Refreshes every entry of `user_id`.
    ///
    /// Per-entry upstream failures are absorbed and counted in `checked`;
    /// only a store failure aborts the batch.
    pub async fn refresh_user_cache(&self, user_id: &str, token: Option<&AccessToken>) -> RefreshResult {
        let Some(token) = token else {
            info!("Skipping cache refresh for user {}: no access token", user_id);
            return RefreshResult::failed(ErrorKind::TokenMissing);
        };

        let started = Instant::now();
        match self.run_batch(user_id, token).await {
            Ok((checked, updated)) => {
                info!(
                    "Cache refresh for user {} done in {:?}: checked={}, updated={}",
                    user_id,
                    started.elapsed(),
                    checked,
                    updated
                );
                RefreshResult::completed(checked, updated)
            }
            Err(e) => {
                error!("Cache refresh for user {} aborted: {}", user_id, e);
                let kind = match e.kind() {
                    ErrorKind::StoreUnavailable => ErrorKind::StoreUnavailable,
                    _ => ErrorKind::Internal,
                };
                RefreshResult::failed(kind)
            }
        }
    }

    async fn run_batch(&self, user_id: &str, token: &AccessToken) -> Result<(usize, usize)> {
        let entries = self.store.find_by_user(user_id).await?;
        debug!(
            "Refreshing {} entries for user {} (width {})",
            entries.len(),
            user_id,
            self.concurrency
        );

        stream::iter(entries)
            .map(|entry| self.refresh_entry(entry, token))
            .buffer_unordered(self.concurrency)
            .try_fold((0usize, 0usize), |(checked, updated), outcome| async move {
                let updated = updated + usize::from(outcome == EntryOutcome::Updated);
                Ok::<_, SyncError>((checked + 1, updated))
            })
            .await
    }

    /// Upstream errors turn into `Skipped`; store errors propagate.
    async fn refresh_entry(&self, entry: CachedEntry, token: &AccessToken) -> Result<EntryOutcome> {
        let channel_id = entry.source_channel_id.as_str();
        if channel_id.trim().is_empty() {
            return Ok(EntryOutcome::Unchanged);
        }

        let fetched = tokio::try_join!(
            self.source.fetch_channel_details(token, channel_id),
            self.source.fetch_latest_item(token, channel_id),
        );
        let (details, latest) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                warn!(
                    "Skipping entry {} ({}) [{:?}, recoverable: {}]: {}",
                    entry.entry_id,
                    channel_id,
                    e.categorize(),
                    e.is_recoverable(),
                    e
                );
                return Ok(EntryOutcome::Skipped);
            }
        };

        let item_details = match latest.as_ref() {
            Some(item) if needs_item_details(&entry, &item.item_id) => {
                match self.source.fetch_item_details(token, &item.item_id).await {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(
                            "Skipping entry {}: item details for {} failed: {}",
                            entry.entry_id, item.item_id, e
                        );
                        return Ok(EntryOutcome::Skipped);
                    }
                }
            }
            _ => None,
        };

        let outcome = merge(
            &entry,
            Some(&details),
            latest.as_ref(),
            item_details.as_ref(),
            Utc::now(),
        );
        if !outcome.changed {
            return Ok(EntryOutcome::Unchanged);
        }

        self.store.upsert(outcome.entry).await?;
        debug!("Entry {} ({}) updated", entry.entry_id, channel_id);
        Ok(EntryOutcome::Updated)
    }
}

/// Item details cost quota: only ask when the item is new or still has gaps.
fn needs_item_details(entry: &CachedEntry, fetched_item_id: &str) -> bool {
    if fetched_item_id.trim().is_empty() {
        return false;
    }
    match entry.latest_item.as_ref() {
        Some(item) if item.item_id == fetched_item_id => item.needs_details(),
        _ => true,
    }
}
