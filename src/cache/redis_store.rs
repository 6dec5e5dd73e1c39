//! Redis-backed entry store.
//!
//! Layout (all keys share the configured prefix):
//! - `{prefix}:entry:{entry_id}` JSON document
//! - `{prefix}:user_entries:{user_id}` set of entry ids
//! - `{prefix}:user_sources:{user_id}` hash of `source_channel_id -> entry_id`

use super::{CacheStore, CachedEntry};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands, Pipeline, Script};
use std::fmt;

/// Claims `(user, source)` and writes the document in one server-side step.
///
/// KEYS: user_sources, user_entries, new entry key.
/// ARGV: source channel id, new entry id, new document, entry key prefix.
/// Returns the winning document. A claim whose document is gone is replaced.
const INSERT_NEW_SCRIPT: &str = r#"
local existing = redis.call("HGET", KEYS[1], ARGV[1])
if existing then
  local doc = redis.call("GET", ARGV[4] .. existing)
  if doc then
    return doc
  end
  redis.call("SREM", KEYS[2], existing)
end
redis.call("SET", KEYS[3], ARGV[3])
redis.call("SADD", KEYS[2], ARGV[2])
redis.call("HSET", KEYS[1], ARGV[1], ARGV[2])
return ARGV[3]
"#;

#[derive(Debug, Clone)]
struct Keyspace {
    prefix: String,
}

impl Keyspace {
    fn entry(&self, entry_id: &str) -> String {
        generate_key(&self.prefix, &["entry", entry_id])
    }

    /// Everything before the id in [`Keyspace::entry`].
    fn entry_prefix(&self) -> String {
        self.entry("")
    }

    fn user_entries(&self, user_id: &str) -> String {
        generate_key(&self.prefix, &["user_entries", user_id])
    }

    fn user_sources(&self, user_id: &str) -> String {
        generate_key(&self.prefix, &["user_sources", user_id])
    }
}

/// Uses a `ConnectionManager` for automatic reconnection and resilience.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn_manager: ConnectionManager,
    keys: Keyspace,
    redis_url: String,
}

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("redis_url", &self.redis_url)
            .field("key_prefix", &self.keys.prefix)
            .field("conn_manager", &"<ConnectionManager instance>")
            .finish()
    }
}

impl RedisCacheStore {
    pub async fn new(redis_url: &str, key_prefix: &str) -> Result<Self> {
        info!("Initializing Redis connection manager for URL: {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            SyncError::StoreUnavailable(format!("Failed to create Redis ConnectionManager: {}", e))
        })?;
        info!("Redis ConnectionManager initialized. Key prefix: {}", key_prefix);
        Ok(Self {
            conn_manager,
            keys: Keyspace {
                prefix: key_prefix.to_string(),
            },
            redis_url: redis_url.to_string(),
        })
    }

    async fn get_entry(&self, entry_id: &str) -> Result<Option<CachedEntry>> {
        let key = self.keys.entry(entry_id);
        let mut conn = self.conn_manager.clone();
        match conn.get::<_, Option<String>>(&key).await? {
            Some(doc) => {
                debug!("Store HIT for key: {}", key);
                decode_entry(&key, &doc).map(Some)
            }
            None => {
                debug!("Store MISS for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn remove_entry(&self, entry: &CachedEntry) -> Result<u64> {
        let mut conn = self.conn_manager.clone();
        let (removed,): (u64,) = removal_pipeline(&self.keys, entry)
            .query_async(&mut conn)
            .await?;
        debug!("Removed entry {} ({} document(s))", entry.entry_id, removed);
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CachedEntry>> {
        let mut conn = self.conn_manager.clone();
        let ids: Vec<String> = conn.smembers(self.keys.user_entries(user_id)).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.get(self.keys.entry(id));
        }
        let docs: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
        Ok(collect_entries(user_id, &ids, docs))
    }

    async fn find_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<Option<CachedEntry>> {
        let mut conn = self.conn_manager.clone();
        let entry_id: Option<String> = conn
            .hget(self.keys.user_sources(user_id), source_channel_id)
            .await?;
        match entry_id {
            Some(id) => Ok(owned_by(self.get_entry(&id).await?, user_id)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<CachedEntry>> {
        self.get_entry(entry_id).await
    }

    async fn upsert(&self, entry: CachedEntry) -> Result<CachedEntry> {
        let doc = serde_json::to_string(&entry)?;
        let mut conn = self.conn_manager.clone();
        store_pipeline(&self.keys, &entry, doc)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!("Store SET success for entry {}", entry.entry_id);
        Ok(entry)
    }

    async fn insert_new(&self, entry: CachedEntry) -> Result<CachedEntry> {
        let doc = serde_json::to_string(&entry)?;
        let mut conn = self.conn_manager.clone();
        let winner: String = Script::new(INSERT_NEW_SCRIPT)
            .key(self.keys.user_sources(&entry.user_id))
            .key(self.keys.user_entries(&entry.user_id))
            .key(self.keys.entry(&entry.entry_id))
            .arg(&entry.source_channel_id)
            .arg(&entry.entry_id)
            .arg(&doc)
            .arg(self.keys.entry_prefix())
            .invoke_async(&mut conn)
            .await?;
        if winner == doc {
            debug!("Inserted entry {} for user {}", entry.entry_id, entry.user_id);
            return Ok(entry);
        }
        let existing = decode_entry(&self.keys.entry(&entry.entry_id), &winner)?;
        debug!(
            "Pair ({}, {}) already held by entry {}",
            entry.user_id, entry.source_channel_id, existing.entry_id
        );
        Ok(existing)
    }

    async fn delete_by_user_and_entry_id(&self, user_id: &str, entry_id: &str) -> Result<u64> {
        match owned_by(self.get_entry(entry_id).await?, user_id) {
            Some(entry) => self.remove_entry(&entry).await,
            None => Ok(0),
        }
    }

    async fn delete_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<u64> {
        match self.find_by_user_and_source_id(user_id, source_channel_id).await? {
            Some(entry) => self.remove_entry(&entry).await,
            None => Ok(0),
        }
    }
}

fn generate_key(prefix: &str, params: &[&str]) -> String {
    let mut key = prefix.to_string();
    for param in params {
        key.push(':');
        key.push_str(param);
    }
    key
}

/// Document plus both index references, in one transaction.
fn store_pipeline(keys: &Keyspace, entry: &CachedEntry, doc: String) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .set(keys.entry(&entry.entry_id), doc)
        .ignore()
        .sadd(keys.user_entries(&entry.user_id), &entry.entry_id)
        .ignore()
        .hset(
            keys.user_sources(&entry.user_id),
            &entry.source_channel_id,
            &entry.entry_id,
        )
        .ignore();
    pipe
}

/// Drops the document and both index references in one transaction; only the
/// `DEL` count is returned.
fn removal_pipeline(keys: &Keyspace, entry: &CachedEntry) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .del(keys.entry(&entry.entry_id))
        .srem(keys.user_entries(&entry.user_id), &entry.entry_id)
        .ignore()
        .hdel(keys.user_sources(&entry.user_id), &entry.source_channel_id)
        .ignore();
    pipe
}

fn owned_by(entry: Option<CachedEntry>, user_id: &str) -> Option<CachedEntry> {
    entry.filter(|e| e.user_id == user_id)
}

/// Pairs indexed ids with fetched documents, skipping dangling, undecodable
/// and foreign ones.
fn collect_entries(user_id: &str, ids: &[String], docs: Vec<Option<String>>) -> Vec<CachedEntry> {
    let mut entries = Vec::with_capacity(docs.len());
    for (id, doc) in ids.iter().zip(docs) {
        match doc {
            Some(doc) => match decode_entry(id, &doc) {
                Ok(entry) if entry.user_id == user_id => entries.push(entry),
                Ok(entry) => warn!(
                    "Entry {} indexed for user {} belongs to {}",
                    id, user_id, entry.user_id
                ),
                Err(e) => warn!("Skipping undecodable entry {}: {}", id, e),
            },
            None => warn!("Dangling index reference {} for user {}", id, user_id),
        }
    }
    entries
}

fn decode_entry(key: &str, doc: &str) -> Result<CachedEntry> {
    serde_json::from_str::<CachedEntry>(doc).map_err(|e| {
        warn!("Failed to deserialize stored entry {}: {}", key, e);
        SyncError::ParseError(format!("Stored entry {} is not valid JSON: {}", key, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn keys() -> Keyspace {
        Keyspace {
            prefix: "cc".to_string(),
        }
    }

    fn entry(id: &str, user: &str, source: &str) -> CachedEntry {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CachedEntry {
            entry_id: id.into(),
            user_id: user.into(),
            source_channel_id: source.into(),
            title: None,
            description: None,
            thumbnail_url: None,
            subscriber_count: None,
            is_featured: false,
            latest_item: None,
            item_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    fn packed(pipe: &Pipeline) -> String {
        String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned()
    }

    fn has_arg(packed: &str, arg: &str) -> bool {
        packed.contains(&format!("\r\n{}\r\n", arg))
    }

    #[test]
    fn test_generate_key() {
        assert_eq!(
            generate_key("channel_cache", &["user_entries", "u1"]),
            "channel_cache:user_entries:u1"
        );
    }

    #[test]
    fn test_keyspace_layout() {
        let keys = keys();
        assert_eq!(keys.entry("e1"), "cc:entry:e1");
        assert_eq!(keys.entry_prefix(), "cc:entry:");
        assert_eq!(format!("{}{}", keys.entry_prefix(), "e1"), keys.entry("e1"));
        assert_eq!(keys.user_entries("u1"), "cc:user_entries:u1");
        assert_eq!(keys.user_sources("u1"), "cc:user_sources:u1");
    }

    #[test]
    fn test_store_pipeline_writes_document_and_both_indexes() {
        let packed = packed(&store_pipeline(&keys(), &entry("e1", "u1", "UC1"), "{}".into()));
        assert!(has_arg(&packed, "MULTI"));
        assert!(has_arg(&packed, "EXEC"));
        assert!(has_arg(&packed, "SET"));
        assert!(has_arg(&packed, "cc:entry:e1"));
        assert!(has_arg(&packed, "SADD"));
        assert!(has_arg(&packed, "cc:user_entries:u1"));
        assert!(has_arg(&packed, "HSET"));
        assert!(has_arg(&packed, "cc:user_sources:u1"));
        assert!(has_arg(&packed, "UC1"));
    }

    #[test]
    fn test_removal_pipeline_clears_document_and_both_indexes() {
        let packed = packed(&removal_pipeline(&keys(), &entry("e1", "u1", "UC1")));
        assert!(has_arg(&packed, "MULTI"));
        assert!(has_arg(&packed, "EXEC"));
        assert!(has_arg(&packed, "DEL"));
        assert!(has_arg(&packed, "cc:entry:e1"));
        assert!(has_arg(&packed, "SREM"));
        assert!(has_arg(&packed, "cc:user_entries:u1"));
        assert!(has_arg(&packed, "HDEL"));
        assert!(has_arg(&packed, "cc:user_sources:u1"));
        assert!(!has_arg(&packed, "SET"));
    }

    #[test]
    fn test_owned_by_filters_foreign_entries() {
        assert_eq!(owned_by(Some(entry("e1", "u1", "UC1")), "u2"), None);
        assert_eq!(owned_by(None, "u1"), None);
        assert_eq!(
            owned_by(Some(entry("e1", "u1", "UC1")), "u1").map(|e| e.entry_id),
            Some("e1".to_string())
        );
    }

    #[test]
    fn test_collect_entries_skips_dangling_garbage_and_foreign() {
        let ids = vec![
            "e1".to_string(),
            "gone".to_string(),
            "bad".to_string(),
            "e4".to_string(),
        ];
        let docs = vec![
            Some(serde_json::to_string(&entry("e1", "u1", "UC1")).unwrap()),
            None,
            Some("{not json".to_string()),
            Some(serde_json::to_string(&entry("e4", "someone-else", "UC4")).unwrap()),
        ];

        let entries = collect_entries("u1", &ids, docs);
        assert_eq!(entries, vec![entry("e1", "u1", "UC1")]);
    }

    #[test]
    fn test_decode_entry_rejects_garbage() {
        assert!(matches!(
            decode_entry("k", "{not json"),
            Err(SyncError::ParseError(_))
        ));
    }

    async fn live_store() -> RedisCacheStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1".to_string());
        let prefix = format!("channel_cache_test_{}", uuid::Uuid::new_v4());
        RedisCacheStore::new(&url, &prefix).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a running Redis (REDIS_URL)"]
    async fn test_live_insert_new_race_keeps_one_entry() {
        let store = live_store().await;
        let (a, b) = tokio::join!(
            store.insert_new(entry("e1", "u1", "UC1")),
            store.insert_new(entry("e2", "u1", "UC1")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.entry_id, b.entry_id);
        let all = store.find_by_user("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].entry_id, a.entry_id);
    }

    #[tokio::test]
    #[ignore = "needs a running Redis (REDIS_URL)"]
    async fn test_live_delete_respects_owner_and_clears_indexes() {
        let store = live_store().await;
        store.insert_new(entry("e1", "u1", "UC1")).await.unwrap();

        assert_eq!(store.delete_by_user_and_entry_id("u2", "e1").await.unwrap(), 0);
        assert_eq!(store.delete_by_user_and_source_id("u1", "UC1").await.unwrap(), 1);
        assert!(store.find_by_user("u1").await.unwrap().is_empty());
        assert!(store.find_by_user_and_source_id("u1", "UC1").await.unwrap().is_none());

        let again = store.insert_new(entry("e2", "u1", "UC1")).await.unwrap();
        assert_eq!(again.entry_id, "e2");
    }
}
