//! Persisted entry storage.
//!
//! Entries are keyed by `entry_id`, indexed by `user_id`, and unique per
//! `(user_id, source_channel_id)`; [`CacheStore::insert_new`] claims a pair
//! atomically. Two backends implement [`CacheStore`]:
//! Redis for deployments and a `DashMap` for tests and local runs.

pub mod entry;
pub mod memory;
pub mod redis_store;

pub use entry::{is_blank, CachedEntry, LatestItem};
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CachedEntry>>;

    async fn find_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<Option<CachedEntry>>;

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<CachedEntry>>;

    /// Inserts or replaces the document keyed by `entry.entry_id`.
    async fn upsert(&self, entry: CachedEntry) -> Result<CachedEntry>;

    /// Inserts `entry` only if `(user_id, source_channel_id)` is free.
    ///
    /// When the pair is already taken the stored entry is returned untouched
    /// and `entry` is discarded. Check and insert happen as one step.
    async fn insert_new(&self, entry: CachedEntry) -> Result<CachedEntry>;

    /// Returns the number of removed entries (0 or 1).
    async fn delete_by_user_and_entry_id(&self, user_id: &str, entry_id: &str) -> Result<u64>;

    /// Returns the number of removed entries (0 or 1).
    async fn delete_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<u64>;
}
