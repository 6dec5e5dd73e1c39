//! Session-facing entry point over the sync engine.

use crate::auth::Session;
use crate::cache::{CacheStore, CachedEntry};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::source::SourceClient;
use crate::sync::{Backfill, EntryListing, RefreshOrchestrator, RefreshResult, SubscriptionManager};
use log::debug;
use std::sync::Arc;

/// Binds the engine components to one source and one store.
///
/// Every operation resolves the user from the session before touching the
/// source or the store.
pub struct ChannelCacheService {
    refresher: RefreshOrchestrator,
    subscriptions: SubscriptionManager,
    listing: EntryListing,
    backfill: Arc<Backfill>,
}

impl ChannelCacheService {
    pub fn new(
        source: Arc<dyn SourceClient>,
        store: Arc<dyn CacheStore>,
        refresh_concurrency: usize,
        new_releases_limit: usize,
    ) -> Self {
        let backfill = Arc::new(Backfill::new(source.clone(), store.clone()));
        Self {
            refresher: RefreshOrchestrator::new(source.clone(), store.clone(), refresh_concurrency),
            subscriptions: SubscriptionManager::new(source, store.clone()),
            listing: EntryListing::new(
                store,
                backfill.clone(),
                new_releases_limit,
                refresh_concurrency,
            ),
            backfill,
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn SourceClient>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self::new(
            source,
            store,
            config.refresh_concurrency,
            config.new_releases_limit,
        )
    }

    /// A missing token is reported inside the result, not as an error.
    pub async fn refresh(&self, session: &dyn Session) -> Result<RefreshResult> {
        let user_id = session.require_user_id()?;
        let token = session.access_token();
        Ok(self.refresher.refresh_user_cache(user_id, token.as_ref()).await)
    }

    pub async fn subscribe(&self, session: &dyn Session, source_channel_id: &str) -> Result<CachedEntry> {
        let user_id = session.require_user_id()?;
        let token = session.access_token();
        self.subscriptions
            .subscribe(user_id, token.as_ref(), source_channel_id.trim())
            .await
    }

    pub async fn unsubscribe(&self, session: &dyn Session, id_or_source_id: &str) -> Result<u64> {
        let user_id = session.require_user_id()?;
        let id = id_or_source_id.trim();
        if id.is_empty() {
            return Err(SyncError::InvalidInput("entry or channel id is required".to_string()));
        }
        self.subscriptions.unsubscribe(user_id, id).await
    }

    pub async fn list_channels(&self, session: &dyn Session) -> Result<Vec<CachedEntry>> {
        let user_id = session.require_user_id()?;
        self.listing.list_channels(user_id).await
    }

    pub async fn list_featured(&self, session: &dyn Session) -> Result<Vec<CachedEntry>> {
        let user_id = session.require_user_id()?;
        self.listing.list_featured(user_id).await
    }

    pub async fn list_new_releases(&self, session: &dyn Session) -> Result<Vec<CachedEntry>> {
        let user_id = session.require_user_id()?;
        let token = session.access_token();
        self.listing.list_new_releases(user_id, token.as_ref()).await
    }

    pub async fn set_featured(
        &self,
        session: &dyn Session,
        source_channel_id: &str,
        featured: bool,
    ) -> Result<CachedEntry> {
        let user_id = session.require_user_id()?;
        self.subscriptions
            .set_featured(user_id, source_channel_id.trim(), featured)
            .await
    }

    pub async fn set_featured_by_id(
        &self,
        session: &dyn Session,
        id_or_source_id: &str,
        featured: bool,
    ) -> Result<CachedEntry> {
        let user_id = session.require_user_id()?;
        self.subscriptions
            .set_featured_by_id(user_id, id_or_source_id.trim(), featured)
            .await
    }

    /// Single-entry backfill for callers that render one entry at a time.
    pub async fn backfill_entry(&self, session: &dyn Session, entry: CachedEntry) -> Result<CachedEntry> {
        let user_id = session.require_user_id()?;
        if entry.user_id != user_id {
            debug!("Refusing backfill of entry {} for user {}", entry.entry_id, user_id);
            return Err(SyncError::NotFound(format!("entry {}", entry.entry_id)));
        }
        let token = session.access_token();
        Ok(self.backfill.backfill_entry(entry, token.as_ref()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticSession;
    use crate::cache::MemoryCacheStore;
    use crate::error::ErrorKind;
    use crate::source::{ChannelDetails, FetchedItem, ItemDetails};
    use crate::testing::{sample_entry, CountingStore, MockSourceClient};
    use chrono::{TimeZone, Utc};

    fn fixture() -> (Arc<MockSourceClient>, Arc<CountingStore<MemoryCacheStore>>, ChannelCacheService) {
        let source = Arc::new(MockSourceClient::new());
        let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
        let service = ChannelCacheService::new(source.clone(), store.clone(), 3, 20);
        (source, store, service)
    }

    fn seed_channel(source: &MockSourceClient, channel_id: &str) {
        source.set_channel(ChannelDetails {
            channel_id: channel_id.to_string(),
            title: Some(format!("Channel {}", channel_id)),
            description: None,
            thumbnail_url: None,
            subscriber_count: Some("10".to_string()),
        });
        source.set_latest_item(
            channel_id,
            FetchedItem {
                item_id: format!("{}-v1", channel_id),
                title: Some("First".to_string()),
                thumbnail_url: None,
                published_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            },
        );
        source.set_item_details(
            &format!("{}-v1", channel_id),
            ItemDetails {
                duration: Some("PT4M".to_string()),
                view_count: Some(7),
            },
        );
    }

    #[tokio::test]
    async fn test_anonymous_session_is_rejected_before_any_access() {
        let (source, store, service) = fixture();
        let anon = StaticSession::anonymous();

        assert_eq!(service.refresh(&anon).await, Err(SyncError::Unauthenticated));
        assert_eq!(service.subscribe(&anon, "UC1").await, Err(SyncError::Unauthenticated));
        assert_eq!(service.unsubscribe(&anon, "UC1").await, Err(SyncError::Unauthenticated));
        assert_eq!(service.list_channels(&anon).await, Err(SyncError::Unauthenticated));
        assert_eq!(service.list_new_releases(&anon).await, Err(SyncError::Unauthenticated));
        assert_eq!(
            service.set_featured_by_id(&anon, "UC1", true).await,
            Err(SyncError::Unauthenticated)
        );
        assert_eq!(source.total_calls(), 0);
        assert_eq!(store.accesses(), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_token_reports_token_missing() {
        let (source, store, service) = fixture();
        let session = StaticSession::authenticated("alice", None);

        let result = service.refresh(&session).await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::TokenMissing));
        assert_eq!(source.total_calls(), 0);
        assert_eq!(store.accesses(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_then_feature_then_list() {
        let (source, _store, service) = fixture();
        seed_channel(&source, "UC1");
        seed_channel(&source, "UC2");
        let session = StaticSession::authenticated("alice", Some("tok"));

        let first = service.subscribe(&session, "UC1").await.unwrap();
        service.subscribe(&session, " UC2 ").await.unwrap();
        service.set_featured_by_id(&session, &first.entry_id, true).await.unwrap();

        let featured = service.list_featured(&session).await.unwrap();
        let regular = service.list_channels(&session).await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].source_channel_id, "UC1");
        assert_eq!(regular.len(), 1);
        assert_eq!(regular[0].source_channel_id, "UC2");
    }

    #[tokio::test]
    async fn test_unsubscribe_rejects_blank_id() {
        let (_source, store, service) = fixture();
        let session = StaticSession::authenticated("alice", Some("tok"));

        assert!(matches!(
            service.unsubscribe(&session, "  ").await,
            Err(SyncError::InvalidInput(_))
        ));
        assert_eq!(store.accesses(), 0);
    }

    #[tokio::test]
    async fn test_backfill_entry_refuses_foreign_entry() {
        let (source, _store, service) = fixture();
        let session = StaticSession::authenticated("alice", Some("tok"));
        let foreign = sample_entry("e9", "bob", "UC9");

        assert!(matches!(
            service.backfill_entry(&session, foreign).await,
            Err(SyncError::NotFound(_))
        ));
        assert_eq!(source.total_calls(), 0);
    }
}
