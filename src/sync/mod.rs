//! The cache synchronization engine.
//!
//! - [`merge`]: pure merge policy shared by every write path
//! - [`refresh`]: bounded-concurrency refresh of a user's whole entry set
//! - [`backfill`]: failure-tolerant enrichment at read time
//! - [`subscribe`]: idempotent registration, removal and classification
//! - [`listing`]: read paths built on the store and backfill

pub mod backfill;
pub mod listing;
pub mod merge;
pub mod refresh;
pub mod subscribe;

pub use backfill::Backfill;
pub use listing::EntryListing;
pub use merge::{merge, merge_item_details, MergeOutcome};
pub use refresh::{RefreshOrchestrator, RefreshResult};
pub use subscribe::SubscriptionManager;
