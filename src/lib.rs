pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod source;
pub mod sync;
pub mod testing; // Mock collaborators shared by unit and integration tests
pub mod utils;

pub use auth::{Session, StaticSession};
pub use cache::{CacheStore, CachedEntry, LatestItem, MemoryCacheStore, RedisCacheStore};
pub use error::{ErrorKind, Result, SyncError};
pub use service::ChannelCacheService;
pub use source::{AccessToken, ChannelDetails, FetchedItem, ItemDetails, SourceClient, YouTubeClient};
pub use sync::{
    merge, Backfill, EntryListing, MergeOutcome, RefreshOrchestrator, RefreshResult,
    SubscriptionManager,
};
