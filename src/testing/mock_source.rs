//! Scripted [`SourceClient`] for tests.

use crate::error::{Result, SyncError};
use crate::source::{AccessToken, ChannelDetails, FetchedItem, ItemDetails, SourceClient};
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Configuration for mock upstream behavior
#[derive(Debug, Clone, Default)]
pub struct MockSourceConfig {
    /// Simulated latency applied to every call
    pub latency: Duration,
}

/// Upstream double. Unknown channels fail with `NotFound`; unknown latest items
/// and item details are absent.
#[derive(Debug, Default)]
pub struct MockSourceClient {
    config: MockSourceConfig,
    channels: DashMap<String, ChannelDetails>,
    latest_items: DashMap<String, FetchedItem>,
    item_details: DashMap<String, ItemDetails>,
    failing_channels: DashMap<String, SyncError>,
    failing_items: DashMap<String, SyncError>,
    channel_calls: AtomicUsize,
    latest_calls: AtomicUsize,
    item_calls: AtomicUsize,
    details_in_flight: AtomicUsize,
    max_details_in_flight: AtomicUsize,
    calls_in_flight: AtomicUsize,
    max_calls_in_flight: AtomicUsize,
}

struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockSourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MockSourceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_channel(&self, details: ChannelDetails) {
        self.channels.insert(details.channel_id.clone(), details);
    }

    pub fn set_latest_item(&self, channel_id: &str, item: FetchedItem) {
        self.latest_items.insert(channel_id.to_string(), item);
    }

    pub fn set_item_details(&self, item_id: &str, details: ItemDetails) {
        self.item_details.insert(item_id.to_string(), details);
    }

    /// Channel details and latest item for `channel_id` fail with a transient error.
    pub fn fail_channel(&self, channel_id: &str) {
        self.failing_channels.insert(
            channel_id.to_string(),
            SyncError::NetworkError(format!("connection reset fetching {}", channel_id)),
        );
    }

    pub fn fail_channel_with(&self, channel_id: &str, err: SyncError) {
        self.failing_channels.insert(channel_id.to_string(), err);
    }

    pub fn fail_item(&self, item_id: &str) {
        self.failing_items.insert(
            item_id.to_string(),
            SyncError::RateLimited("quotaExceeded".to_string()),
        );
    }

    pub fn channel_details_calls(&self) -> usize {
        self.channel_calls.load(Ordering::SeqCst)
    }

    pub fn latest_item_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn item_details_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.channel_details_calls() + self.latest_item_calls() + self.item_details_calls()
    }

    /// Peak number of entries whose channel-details call was outstanding at once.
    pub fn max_details_in_flight(&self) -> usize {
        self.max_details_in_flight.load(Ordering::SeqCst)
    }

    /// Peak number of upstream calls of any kind outstanding at once.
    pub fn max_calls_in_flight(&self) -> usize {
        self.max_calls_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn channel_failure(&self, channel_id: &str) -> Option<SyncError> {
        self.failing_channels.get(channel_id).map(|e| e.value().clone())
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    async fn fetch_channel_details(
        &self,
        _token: &AccessToken,
        channel_id: &str,
    ) -> Result<ChannelDetails> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        let _details = InFlight::enter(&self.details_in_flight, &self.max_details_in_flight);
        let _call = InFlight::enter(&self.calls_in_flight, &self.max_calls_in_flight);
        self.simulate_latency().await;
        debug!("mock: channel details {}", channel_id);

        if let Some(err) = self.channel_failure(channel_id) {
            return Err(err);
        }
        self.channels
            .get(channel_id)
            .map(|d| d.value().clone())
            .ok_or_else(|| SyncError::NotFound(format!("channel {}", channel_id)))
    }

    async fn fetch_latest_item(
        &self,
        _token: &AccessToken,
        channel_id: &str,
    ) -> Result<Option<FetchedItem>> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        let _call = InFlight::enter(&self.calls_in_flight, &self.max_calls_in_flight);
        self.simulate_latency().await;

        if let Some(err) = self.channel_failure(channel_id) {
            return Err(err);
        }
        Ok(self.latest_items.get(channel_id).map(|i| i.value().clone()))
    }

    async fn fetch_item_details(
        &self,
        _token: &AccessToken,
        item_id: &str,
    ) -> Result<Option<ItemDetails>> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        let _call = InFlight::enter(&self.calls_in_flight, &self.max_calls_in_flight);
        self.simulate_latency().await;

        if let Some(err) = self.failing_items.get(item_id).map(|e| e.value().clone()) {
            return Err(err);
        }
        Ok(self.item_details.get(item_id).map(|d| d.value().clone()))
    }
}
