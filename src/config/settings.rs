use crate::sync::listing::DEFAULT_NEW_RELEASES_LIMIT;
use crate::sync::refresh::DEFAULT_REFRESH_CONCURRENCY;
use std::env;

pub const DEFAULT_YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_api_base_url: String,
    pub youtube_request_timeout_ms: u64,
    pub refresh_concurrency: usize,
    pub new_releases_limit: usize,
    pub redis_url: String,
    pub redis_key_prefix: String,
    pub log_level: log::LevelFilter,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            youtube_api_base_url: env::var("YOUTUBE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_YOUTUBE_API_BASE_URL.to_string()),
            youtube_request_timeout_ms: env::var("YOUTUBE_REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000),
            refresh_concurrency: env::var("REFRESH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_CONCURRENCY),
            new_releases_limit: env::var("NEW_RELEASES_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_NEW_RELEASES_LIMIT),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost".to_string()),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| "channel_cache".to_string()),
            log_level: env::var("LOG_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(log::LevelFilter::Info),
        }
    }

    pub fn test_default() -> Self {
        Self {
            youtube_api_base_url: "http://localhost:8080/youtube/v3".to_string(),
            youtube_request_timeout_ms: 1_000,
            refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
            new_releases_limit: DEFAULT_NEW_RELEASES_LIMIT,
            redis_url: "redis://localhost".to_string(),
            redis_key_prefix: "channel_cache_test".to_string(),
            log_level: log::LevelFilter::Debug,
        }
    }

    pub fn validate_and_log(&self) {
        log::info!("Application Configuration Loaded: {:?}", self);
        if self.refresh_concurrency > 10 {
            log::warn!(
                "REFRESH_CONCURRENCY is {}; wide batches burn upstream quota quickly",
                self.refresh_concurrency
            );
        }
    }
}
