//! First registration, removal and classification of entries.

use crate::cache::{CacheStore, CachedEntry, LatestItem};
use crate::error::{Result, SyncError};
use crate::source::{AccessToken, SourceClient};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

pub struct SubscriptionManager {
    source: Arc<dyn SourceClient>,
    store: Arc<dyn CacheStore>,
}

impl SubscriptionManager {
    pub fn new(source: Arc<dyn SourceClient>, store: Arc<dyn CacheStore>) -> Self {
        Self { source, store }
    }

    /// Registers `source_channel_id` for `user_id`, or returns the existing entry untouched.
    ///
    /// Unlike refresh, every upstream failure here reaches the caller.
    pub async fn subscribe(
        &self,
        user_id: &str,
        token: Option<&AccessToken>,
        source_channel_id: &str,
    ) -> Result<CachedEntry> {
        let token = token.ok_or(SyncError::TokenMissing)?;
        if source_channel_id.trim().is_empty() {
            return Err(SyncError::InvalidInput("channel id is required".to_string()));
        }

        if let Some(existing) = self
            .store
            .find_by_user_and_source_id(user_id, source_channel_id)
            .await?
        {
            debug!(
                "User {} already subscribed to {} as {}",
                user_id, source_channel_id, existing.entry_id
            );
            return Ok(existing);
        }

        let (details, latest) = tokio::try_join!(
            self.source.fetch_channel_details(token, source_channel_id),
            self.source.fetch_latest_item(token, source_channel_id),
        )?;

        let item_details = match latest.as_ref() {
            Some(item) => self.source.fetch_item_details(token, &item.item_id).await?,
            None => None,
        };

        let now = Utc::now();
        let latest_item = latest.map(|item| {
            let fetched = item_details.unwrap_or_default();
            LatestItem {
                item_id: item.item_id,
                title: item.title,
                thumbnail_url: item.thumbnail_url,
                published_at: item.published_at,
                duration: fetched.duration,
                view_count: fetched.view_count,
            }
        });
        let entry = CachedEntry {
            entry_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source_channel_id: source_channel_id.to_string(),
            title: details.title,
            description: details.description,
            thumbnail_url: details.thumbnail_url,
            subscriber_count: details.subscriber_count,
            is_featured: false,
            latest_item,
            item_count: 0,
            created_at: now,
            updated_at: now,
        };

        let candidate_id = entry.entry_id.clone();
        let saved = self.store.insert_new(entry).await?;
        if saved.entry_id != candidate_id {
            debug!(
                "Concurrent subscribe of {} for user {} won by entry {}",
                source_channel_id, user_id, saved.entry_id
            );
            return Ok(saved);
        }
        info!(
            "User {} subscribed to {} (entry {})",
            user_id, source_channel_id, saved.entry_id
        );
        Ok(saved)
    }

    /// Deletes by entry id first; only if that removed nothing, by source channel id.
    pub async fn unsubscribe(&self, user_id: &str, id_or_source_id: &str) -> Result<u64> {
        let removed = self
            .store
            .delete_by_user_and_entry_id(user_id, id_or_source_id)
            .await?;
        if removed > 0 {
            info!("User {} unsubscribed entry {}", user_id, id_or_source_id);
            return Ok(removed);
        }
        let removed = self
            .store
            .delete_by_user_and_source_id(user_id, id_or_source_id)
            .await?;
        info!(
            "User {} unsubscribed channel {} ({} removed)",
            user_id, id_or_source_id, removed
        );
        Ok(removed)
    }

    pub async fn set_featured(
        &self,
        user_id: &str,
        source_channel_id: &str,
        featured: bool,
    ) -> Result<CachedEntry> {
        let entry = self
            .store
            .find_by_user_and_source_id(user_id, source_channel_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("entry for channel {}", source_channel_id)))?;
        self.write_featured(entry, featured).await
    }

    /// Looks the entry up by id (owned by `user_id`), then by source channel id.
    pub async fn set_featured_by_id(
        &self,
        user_id: &str,
        id_or_source_id: &str,
        featured: bool,
    ) -> Result<CachedEntry> {
        let by_id = self
            .store
            .find_by_id(id_or_source_id)
            .await?
            .filter(|e| e.user_id == user_id);
        let entry = match by_id {
            Some(entry) => entry,
            None => self
                .store
                .find_by_user_and_source_id(user_id, id_or_source_id)
                .await?
                .ok_or_else(|| SyncError::NotFound(format!("entry {}", id_or_source_id)))?,
        };
        self.write_featured(entry, featured).await
    }

    async fn write_featured(&self, mut entry: CachedEntry, featured: bool) -> Result<CachedEntry> {
        entry.is_featured = featured;
        entry.updated_at = Utc::now();
        self.store.upsert(entry).await
    }
}
