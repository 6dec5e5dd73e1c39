//! External source client contract.
//!
//! The engine only ever talks to the upstream provider through [`SourceClient`];
//! the YouTube Data API implementation lives in [`youtube`].

pub mod youtube;
pub mod youtube_api;

pub use youtube::YouTubeClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque bearer credential handed over by the auth collaborator.
///
/// A token is never blank: [`AccessToken::new`] rejects empty and whitespace-only input,
/// so "present" always means "usable as a bearer credential".
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Builds a token from an optional raw value, treating blank as absent.
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|r| Self::new(r))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Channel-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelDetails {
    pub channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<String>,
}

/// The channel's most recent item as reported by the upstream search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedItem {
    pub item_id: String,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Item-keyed statistics, fetched separately from the item itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub duration: Option<String>,
    pub view_count: Option<u64>,
}

#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fails with `SyncError::NotFound` when the channel does not exist upstream.
    async fn fetch_channel_details(
        &self,
        token: &AccessToken,
        channel_id: &str,
    ) -> Result<ChannelDetails>;

    /// `Ok(None)` when the channel has no items; absence is not an error.
    async fn fetch_latest_item(
        &self,
        token: &AccessToken,
        channel_id: &str,
    ) -> Result<Option<FetchedItem>>;

    /// `Ok(None)` when the item is unknown upstream.
    async fn fetch_item_details(
        &self,
        token: &AccessToken,
        item_id: &str,
    ) -> Result<Option<ItemDetails>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_absent() {
        assert!(AccessToken::new("").is_none());
        assert!(AccessToken::new("   ").is_none());
        assert!(AccessToken::from_optional(None).is_none());
        assert_eq!(
            AccessToken::from_optional(Some("ya29.abc")).map(|t| t.expose().to_string()),
            Some("ya29.abc".to_string())
        );
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("secret").unwrap();
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
