//! Instrumented [`CacheStore`] wrapper.

use crate::cache::{CacheStore, CachedEntry};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Delegates to `inner`, counting every access. Reads and writes can be
/// switched to fail with `StoreUnavailable` independently.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    accesses: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<S: CacheStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            accesses: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total reads and writes attempted, including failed ones.
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> Result<()> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable("read refused".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable("write refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for CountingStore<S> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CachedEntry>> {
        self.read()?;
        self.inner.find_by_user(user_id).await
    }

    async fn find_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<Option<CachedEntry>> {
        self.read()?;
        self.inner
            .find_by_user_and_source_id(user_id, source_channel_id)
            .await
    }

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<CachedEntry>> {
        self.read()?;
        self.inner.find_by_id(entry_id).await
    }

    async fn upsert(&self, entry: CachedEntry) -> Result<CachedEntry> {
        self.write()?;
        self.inner.upsert(entry).await
    }

    async fn insert_new(&self, entry: CachedEntry) -> Result<CachedEntry> {
        self.write()?;
        self.inner.insert_new(entry).await
    }

    async fn delete_by_user_and_entry_id(&self, user_id: &str, entry_id: &str) -> Result<u64> {
        self.write()?;
        self.inner.delete_by_user_and_entry_id(user_id, entry_id).await
    }

    async fn delete_by_user_and_source_id(
        &self,
        user_id: &str,
        source_channel_id: &str,
    ) -> Result<u64> {
        self.write()?;
        self.inner
            .delete_by_user_and_source_id(user_id, source_channel_id)
            .await
    }
}
