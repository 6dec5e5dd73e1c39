//! Integration tests for the session façade: subscribe, list, feature,
//! new releases and unsubscribe against the in-memory store.

use channel_cache_sync::{
    cache::{CacheStore, MemoryCacheStore},
    testing::{CountingStore, MockSourceClient, MockSourceConfig},
    ChannelCacheService, ChannelDetails, FetchedItem, ItemDetails, StaticSession, SyncError,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn seed(source: &MockSourceClient, channel_id: &str, item_id: &str, day: u32) {
    source.set_channel(ChannelDetails {
        channel_id: channel_id.to_string(),
        title: Some(format!("Artist {}", channel_id)),
        description: None,
        thumbnail_url: None,
        subscriber_count: Some("42".to_string()),
    });
    source.set_latest_item(
        channel_id,
        FetchedItem {
            item_id: item_id.to_string(),
            title: Some(format!("Track {}", item_id)),
            thumbnail_url: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()),
        },
    );
}

fn service_with(
    source: Arc<MockSourceClient>,
    store: Arc<CountingStore<MemoryCacheStore>>,
    limit: usize,
) -> ChannelCacheService {
    ChannelCacheService::new(source, store, 3, limit)
}

#[tokio::test]
async fn test_double_subscribe_yields_one_identical_entry() {
    let source = Arc::new(MockSourceClient::new());
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    seed(&source, "UC1", "v1", 1);
    let service = service_with(source.clone(), store.clone(), 20);
    let session = StaticSession::authenticated("alice", Some("tok"));

    let first = service.subscribe(&session, "UC1").await.unwrap();
    let calls_after_first = source.total_calls();
    let second = service.subscribe(&session, "UC1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.total_calls(), calls_after_first);
    assert_eq!(store.inner().len(), 1);
    assert_eq!(store.find_by_user("alice").await.unwrap(), vec![first]);
}

#[tokio::test]
async fn test_overlapping_subscribes_from_two_sessions_share_one_entry() {
    let source = Arc::new(MockSourceClient::with_config(MockSourceConfig {
        latency: Duration::from_millis(20),
    }));
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    seed(&source, "UC1", "v1", 1);
    let service = service_with(source.clone(), store.clone(), 20);
    let phone = StaticSession::authenticated("alice", Some("tok"));
    let laptop = StaticSession::authenticated("alice", Some("tok"));

    let (a, b) = tokio::join!(
        service.subscribe(&phone, "UC1"),
        service.subscribe(&laptop, "UC1"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(store.inner().len(), 1);
    assert_eq!(service.list_channels(&phone).await.unwrap(), vec![a]);
}

#[tokio::test]
async fn test_subscribe_surfaces_unknown_channel() {
    let source = Arc::new(MockSourceClient::new());
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    let service = service_with(source, store.clone(), 20);
    let session = StaticSession::authenticated("alice", Some("tok"));

    assert!(matches!(
        service.subscribe(&session, "UCmissing").await,
        Err(SyncError::NotFound(_))
    ));
    assert!(store.inner().is_empty());
}

#[tokio::test]
async fn test_subscribe_without_token_touches_nothing() {
    let source = Arc::new(MockSourceClient::new());
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    let service = service_with(source.clone(), store.clone(), 20);
    let session = StaticSession::authenticated("alice", Some("   "));

    assert_eq!(service.subscribe(&session, "UC1").await, Err(SyncError::TokenMissing));
    assert_eq!(source.total_calls(), 0);
    assert_eq!(store.accesses(), 0);
}

#[tokio::test]
async fn test_new_releases_are_newest_first_and_capped() {
    let source = Arc::new(MockSourceClient::new());
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    seed(&source, "UC1", "a", 3);
    seed(&source, "UC2", "b", 9);
    seed(&source, "UC3", "c", 5);
    source.set_item_details(
        "b",
        ItemDetails {
            duration: Some("PT3M30S".to_string()),
            view_count: Some(900),
        },
    );
    let service = service_with(source.clone(), store.clone(), 2);
    let session = StaticSession::authenticated("alice", Some("tok"));
    for channel in ["UC1", "UC2", "UC3"] {
        service.subscribe(&session, channel).await.unwrap();
    }

    let releases = service.list_new_releases(&session).await.unwrap();
    let ids: Vec<_> = releases
        .iter()
        .filter_map(|e| e.latest_item_id().map(String::from))
        .collect();
    assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    let top = releases[0].latest_item.as_ref().unwrap();
    assert_eq!(top.duration.as_deref(), Some("PT3M30S"));

    // Without a token the listing still works, it just skips enrichment.
    let anonymous_token = StaticSession::authenticated("alice", None);
    let calls = source.total_calls();
    assert_eq!(service.list_new_releases(&anonymous_token).await.unwrap().len(), 2);
    assert_eq!(source.total_calls(), calls);
}

#[tokio::test]
async fn test_feature_and_unsubscribe_by_either_id() {
    let source = Arc::new(MockSourceClient::new());
    let store = Arc::new(CountingStore::new(MemoryCacheStore::new()));
    seed(&source, "UC1", "v1", 1);
    seed(&source, "UC2", "v2", 2);
    let service = service_with(source, store.clone(), 20);
    let session = StaticSession::authenticated("alice", Some("tok"));
    let first = service.subscribe(&session, "UC1").await.unwrap();
    service.subscribe(&session, "UC2").await.unwrap();

    let featured = service.set_featured(&session, "UC2", true).await.unwrap();
    assert!(featured.is_featured);
    assert_eq!(service.list_featured(&session).await.unwrap().len(), 1);

    // Another user cannot reach alice's entry by id.
    let bob = StaticSession::authenticated("bob", Some("tok"));
    assert_eq!(service.unsubscribe(&bob, &first.entry_id).await, Ok(0));

    assert_eq!(service.unsubscribe(&session, &first.entry_id).await, Ok(1));
    assert_eq!(service.unsubscribe(&session, "UC2").await, Ok(1));
    assert_eq!(service.unsubscribe(&session, "UC2").await, Ok(0));
    assert!(store.inner().is_empty());
}
