use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    /// No authenticated user identity on the session
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The upstream bearer token is absent or blank
    #[error("Access token missing")]
    TokenMissing,

    /// The upstream API has no such channel/item
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Upstream quota or rate limit hit
    #[error("Rate Limited: {0}")]
    RateLimited(String),

    /// Network/connectivity issues and unexpected upstream statuses
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Upstream payload or stored document could not be decoded
    #[error("Parse Error: {0}")]
    ParseError(String),

    /// The cache store could not be reached or failed mid-operation
    #[error("Store Unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// Invalid input parameters
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::ParseError(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::ParseError(format!("Upstream response decode error: {}", err))
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            SyncError::RateLimited(format!("Upstream rate limit: {}", err))
        } else {
            SyncError::NetworkError(format!("HTTP client error: {}", err))
        }
    }
}

impl From<redis::RedisError> for SyncError {
    fn from(err: redis::RedisError) -> Self {
        SyncError::StoreUnavailable(format!("Redis error: {}", err))
    }
}

impl SyncError {
    /// Stable label for this error, as carried in refresh results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Unauthenticated => ErrorKind::Unauthenticated,
            SyncError::TokenMissing => ErrorKind::TokenMissing,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::RateLimited(_) => ErrorKind::RateLimited,
            SyncError::NetworkError(_) => ErrorKind::Transient,
            SyncError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            SyncError::InvalidInput(_) => ErrorKind::InvalidInput,
            SyncError::ParseError(_) | SyncError::ConfigError(_) => ErrorKind::Internal,
        }
    }

    /// Determines if a later pass (the next externally triggered refresh) can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Unauthenticated => false,
            SyncError::TokenMissing => false, // Needs a fresh OAuth grant
            SyncError::NotFound(_) => false,
            SyncError::RateLimited(_) => true, // Quota resets
            SyncError::NetworkError(_) => true,
            SyncError::ParseError(_) => false,
            SyncError::StoreUnavailable(_) => true, // Redis might recover
            SyncError::ConfigError(_) => false,
            SyncError::InvalidInput(_) => false,
        }
    }

    /// Categorizes error for logging
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            SyncError::Unauthenticated | SyncError::TokenMissing => ErrorCategory::Auth,
            SyncError::NotFound(_) | SyncError::RateLimited(_) | SyncError::NetworkError(_) => {
                ErrorCategory::Upstream
            }
            SyncError::ParseError(_) | SyncError::InvalidInput(_) => ErrorCategory::Data,
            SyncError::StoreUnavailable(_) => ErrorCategory::Storage,
            SyncError::ConfigError(_) => ErrorCategory::Configuration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    Auth,
    Upstream,
    Data,
    Storage,
    Configuration,
}

/// Error label exposed to callers of the refresh batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    TokenMissing,
    NotFound,
    RateLimited,
    Transient,
    StoreUnavailable,
    InvalidInput,
    Internal,
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(SyncError::TokenMissing.kind(), ErrorKind::TokenMissing);
        assert_eq!(
            SyncError::StoreUnavailable("down".into()).kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(SyncError::NetworkError("reset".into()).kind(), ErrorKind::Transient);
        assert_eq!(SyncError::ParseError("bad".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_recoverability() {
        assert!(SyncError::RateLimited("quotaExceeded".into()).is_recoverable());
        assert!(!SyncError::NotFound("channel".into()).is_recoverable());
        assert_eq!(SyncError::TokenMissing.categorize(), ErrorCategory::Auth);
    }

    #[test]
    fn test_config_errors_are_internal_and_final() {
        let err = SyncError::ConfigError("REDIS_URL cannot be empty".into());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.categorize(), ErrorCategory::Configuration);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StoreUnavailable).unwrap();
        assert_eq!(json, "\"store_unavailable\"");
    }
}
