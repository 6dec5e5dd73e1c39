pub mod settings;

pub use settings::Config;

use crate::error::SyncError;
use std::sync::Arc;
use url::Url;

/// Loads, validates and returns the application configuration as an `Arc<Config>`.
///
/// Resolved once at bootstrap and handed to the engine; nothing downstream
/// re-reads the environment.
pub fn load_config() -> Result<Arc<Config>, SyncError> {
    dotenv::dotenv().ok(); // Load .env file if present, ignore errors

    let config = Config::from_env();
    validate(&config)?;
    config.validate_and_log();

    Ok(Arc::new(config))
}

pub fn validate(config: &Config) -> Result<(), SyncError> {
    Url::parse(&config.youtube_api_base_url).map_err(|e| {
        SyncError::ConfigError(format!(
            "YOUTUBE_API_BASE_URL '{}' is not a valid url: {}",
            config.youtube_api_base_url, e
        ))
    })?;
    if config.redis_url.is_empty() {
        return Err(SyncError::ConfigError("REDIS_URL cannot be empty".to_string()));
    }
    if config.youtube_request_timeout_ms == 0 {
        return Err(SyncError::ConfigError(
            "YOUTUBE_REQUEST_TIMEOUT_MS must be positive".to_string(),
        ));
    }
    if config.refresh_concurrency == 0 {
        return Err(SyncError::ConfigError(
            "REFRESH_CONCURRENCY must be at least 1".to_string(),
        ));
    }
    if config.new_releases_limit == 0 {
        return Err(SyncError::ConfigError("NEW_RELEASES_LIMIT must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::test_default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::test_default();
        config.youtube_api_base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(SyncError::ConfigError(_))));

        let mut config = Config::test_default();
        config.new_releases_limit = 0;
        assert!(matches!(validate(&config), Err(SyncError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_zero_refresh_concurrency() {
        let mut config = Config::test_default();
        config.refresh_concurrency = 0;
        assert!(matches!(validate(&config), Err(SyncError::ConfigError(_))));

        config.refresh_concurrency = 1;
        assert!(validate(&config).is_ok());
    }
}
