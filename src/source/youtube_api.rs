//! YouTube Data API v3 response structures.
//!
//! Only the fields the cache engine reads are modelled; everything is optional
//! because the API omits parts it was not asked for (or has no value for).

use serde::Deserialize;

/// Envelope shared by `/channels`, `/search` and `/videos`
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

impl Thumbnails {
    /// First present url in the given preference order.
    pub fn pick(&self, order: &[ThumbnailSize]) -> Option<String> {
        order.iter().find_map(|size| {
            let thumb = match size {
                ThumbnailSize::Default => self.default.as_ref(),
                ThumbnailSize::Medium => self.medium.as_ref(),
                ThumbnailSize::High => self.high.as_ref(),
            };
            thumb.and_then(|t| t.url.clone())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Default,
    Medium,
    High,
}

/// `/channels?part=snippet,statistics`
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelResource {
    pub id: Option<String>,
    pub snippet: Option<ChannelSnippet>,
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelStatistics {
    /// Absent when the channel hides its subscriber count
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,
}

/// `/search?part=snippet&type=video`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: Option<SearchResultId>,
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResultId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSnippet {
    pub title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

/// `/videos?part=contentDetails,statistics`
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResource {
    #[serde(rename = "contentDetails")]
    pub content_details: Option<VideoContentDetails>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoContentDetails {
    /// ISO 8601 duration, e.g. `PT4M13S`
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoStatistics {
    /// The API encodes counts as decimal strings
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub reason: Option<String>,
    pub domain: Option<String>,
}
