//! Auth collaborator contract.
//!
//! Session handling and OAuth live outside this crate; the engine only needs
//! a user identity (mandatory) and an upstream token (optional).

use crate::error::{Result, SyncError};
use crate::source::AccessToken;

pub trait Session: Send + Sync {
    fn user_id(&self) -> Option<&str>;

    /// Never fails; a missing or blank token is simply `None`.
    fn access_token(&self) -> Option<AccessToken>;

    fn require_user_id(&self) -> Result<&str> {
        self.user_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or(SyncError::Unauthenticated)
    }
}

/// A session whose values were resolved up front, e.g. from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user_id: Option<String>,
    token: Option<String>,
}

impl StaticSession {
    pub fn new(user_id: Option<String>, token: Option<String>) -> Self {
        Self { user_id, token }
    }

    pub fn authenticated(user_id: &str, token: Option<&str>) -> Self {
        Self::new(Some(user_id.to_string()), token.map(String::from))
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl Session for StaticSession {
    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn access_token(&self) -> Option<AccessToken> {
        AccessToken::from_optional(self.token.as_deref())
    }
}
