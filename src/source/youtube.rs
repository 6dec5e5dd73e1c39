//! YouTube Data API v3 implementation of [`SourceClient`].

use super::youtube_api::{
    ApiErrorResponse, ChannelResource, ListResponse, SearchResult, ThumbnailSize, VideoResource,
};
use super::{AccessToken, ChannelDetails, FetchedItem, ItemDetails, SourceClient};
use crate::config::Config;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// 403 reasons the API uses for quota exhaustion and throttling
const RATE_LIMIT_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: Url,
}

impl YouTubeClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        // A trailing slash keeps `Url::join` from dropping the `/v3` segment
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| SyncError::ConfigError(format!("Invalid API base url '{}': {}", base_url, e)))?;
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SyncError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.youtube_api_base_url,
            Duration::from_millis(config.youtube_request_timeout_ms),
        )
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<ListResponse<T>> {
        let url = self
            .base_url
            .join(resource)
            .map_err(|e| SyncError::ConfigError(format!("Invalid resource path '{}': {}", resource, e)))?;
        debug!("GET {} {:?}", url, query);

        let resp = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(token.expose())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = classify_error(status, &body);
            warn!("YouTube API {} returned {}: {}", resource, status, err);
            return Err(err);
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str::<ListResponse<T>>(&body)?)
    }
}

#[async_trait]
impl SourceClient for YouTubeClient {
    async fn fetch_channel_details(
        &self,
        token: &AccessToken,
        channel_id: &str,
    ) -> Result<ChannelDetails> {
        let resp: ListResponse<ChannelResource> = self
            .get_list(
                token,
                "channels",
                &[("part", "snippet,statistics"), ("id", channel_id), ("maxResults", "1")],
            )
            .await?;
        channel_details_from(resp, channel_id)
    }

    async fn fetch_latest_item(
        &self,
        token: &AccessToken,
        channel_id: &str,
    ) -> Result<Option<FetchedItem>> {
        let resp: ListResponse<SearchResult> = self
            .get_list(
                token,
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("order", "date"),
                    ("maxResults", "1"),
                    ("channelId", channel_id),
                ],
            )
            .await?;
        Ok(latest_item_from(resp))
    }

    async fn fetch_item_details(
        &self,
        token: &AccessToken,
        item_id: &str,
    ) -> Result<Option<ItemDetails>> {
        if item_id.trim().is_empty() {
            return Ok(None);
        }
        let resp: ListResponse<VideoResource> = self
            .get_list(
                token,
                "videos",
                &[("part", "contentDetails,statistics"), ("id", item_id), ("maxResults", "1")],
            )
            .await?;
        Ok(item_details_from(resp))
    }
}

pub(crate) fn channel_details_from(
    resp: ListResponse<ChannelResource>,
    requested_id: &str,
) -> Result<ChannelDetails> {
    let item = resp
        .items
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound(format!("channel {}", requested_id)))?;

    let (title, description, thumbnail_url) = match item.snippet {
        Some(snippet) => (
            snippet.title,
            snippet.description,
            snippet.thumbnails.pick(&[
                ThumbnailSize::Default,
                ThumbnailSize::Medium,
                ThumbnailSize::High,
            ]),
        ),
        None => (None, None, None),
    };

    Ok(ChannelDetails {
        channel_id: item.id.unwrap_or_else(|| requested_id.to_string()),
        title,
        description,
        thumbnail_url,
        subscriber_count: item.statistics.and_then(|s| s.subscriber_count),
    })
}

pub(crate) fn latest_item_from(resp: ListResponse<SearchResult>) -> Option<FetchedItem> {
    let item = resp.items.into_iter().next()?;
    let item_id = item
        .id
        .and_then(|id| id.video_id)
        .filter(|id| !id.trim().is_empty())?;

    let (title, thumbnail_url, published_at) = match item.snippet {
        Some(snippet) => (
            snippet.title,
            snippet
                .thumbnails
                .pick(&[ThumbnailSize::Medium, ThumbnailSize::Default]),
            snippet.published_at.as_deref().and_then(parse_instant),
        ),
        None => (None, None, None),
    };

    Some(FetchedItem {
        item_id,
        title,
        thumbnail_url,
        published_at,
    })
}

pub(crate) fn item_details_from(resp: ListResponse<VideoResource>) -> Option<ItemDetails> {
    let item = resp.items.into_iter().next()?;
    Some(ItemDetails {
        duration: item.content_details.and_then(|c| c.duration),
        view_count: item
            .statistics
            .and_then(|s| s.view_count)
            .and_then(|v| v.trim().parse::<u64>().ok()),
    })
}

/// RFC 3339 instant; anything unparsable is treated as absent.
pub(crate) fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if value.trim().is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

pub(crate) fn classify_error(status: StatusCode, body: &str) -> SyncError {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| status.to_string());
    let rate_limited_reason = parsed.as_ref().and_then(|e| {
        e.error
            .errors
            .iter()
            .filter_map(|d| d.reason.as_deref())
            .find(|r| RATE_LIMIT_REASONS.contains(r))
            .map(str::to_string)
    });

    match status {
        StatusCode::NOT_FOUND => SyncError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited(message),
        StatusCode::FORBIDDEN if rate_limited_reason.is_some() => {
            SyncError::RateLimited(rate_limited_reason.unwrap_or(message))
        }
        _ => SyncError::NetworkError(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}
