use super::{CacheStore, CachedEntry};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;

type SourceKey = (String, String);

fn source_key(user_id: &str, source_channel_id: &str) -> SourceKey {
    (user_id.to_string(), source_channel_id.to_string())
}

/// In-process entry store. Per-document writes are atomic; there is no
/// cross-entry locking apart from the `(user, source)` claim in `insert_new`.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CachedEntry>,
    /// `(user_id, source_channel_id) -> entry_id`
    sources: DashMap<SourceKey, String>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_where(&self, pred: impl Fn(&CachedEntry) -> bool) -> u64 {
        let victim = self
            .entries
            .iter()
            .find(|e| pred(e.value()))
            .map(|e| e.key().clone());
        let Some(key) = victim else {
            return 0;
        };
        match self.entries.remove(&key) {
            Some((_, removed)) => {
                self.sources.remove_if(
                    &source_key(&removed.user_id, &removed.source_channel_id),
                    |_, id| *id == removed.entry_id,
                );
                1
            }
            None => 0,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CachedEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn find_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<Option<CachedEntry>> {
        let entry_id = self
            .sources
            .get(&source_key(user_id, source_channel_id))
            .map(|id| id.value().clone());
        Ok(entry_id
            .and_then(|id| self.entries.get(&id).map(|e| e.value().clone()))
            .filter(|e| e.user_id == user_id))
    }

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<CachedEntry>> {
        Ok(self.entries.get(entry_id).map(|e| e.value().clone()))
    }

    async fn upsert(&self, entry: CachedEntry) -> Result<CachedEntry> {
        debug!("Upserting entry {} for user {}", entry.entry_id, entry.user_id);
        self.sources.insert(
            source_key(&entry.user_id, &entry.source_channel_id),
            entry.entry_id.clone(),
        );
        self.entries.insert(entry.entry_id.clone(), entry.clone());
        Ok(entry)
    }

    async fn insert_new(&self, entry: CachedEntry) -> Result<CachedEntry> {
        // The shard guard on `sources` is held until the document is in place.
        match self
            .sources
            .entry(source_key(&entry.user_id, &entry.source_channel_id))
        {
            Entry::Occupied(mut claimed) => {
                if let Some(existing) = self.entries.get(claimed.get()) {
                    debug!(
                        "Pair ({}, {}) already held by entry {}",
                        entry.user_id,
                        entry.source_channel_id,
                        existing.entry_id
                    );
                    return Ok(existing.value().clone());
                }
                // Dangling claim: take it over.
                claimed.insert(entry.entry_id.clone());
                self.entries.insert(entry.entry_id.clone(), entry.clone());
                Ok(entry)
            }
            Entry::Vacant(slot) => {
                self.entries.insert(entry.entry_id.clone(), entry.clone());
                slot.insert(entry.entry_id.clone());
                debug!("Inserted entry {} for user {}", entry.entry_id, entry.user_id);
                Ok(entry)
            }
        }
    }

    async fn delete_by_user_and_entry_id(&self, user_id: &str, entry_id: &str) -> Result<u64> {
        Ok(self.remove_where(|e| e.user_id == user_id && e.entry_id == entry_id))
    }

    async fn delete_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<u64> {
        Ok(self.remove_where(|e| e.user_id == user_id && e.source_channel_id == source_channel_id))
    }
}
