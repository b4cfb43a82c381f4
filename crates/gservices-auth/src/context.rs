//! Per-call authorization handed to service adapters.

use std::fmt;

use chrono::{DateTime, Utc};

/// A checked access token together with the scopes it is used under.
///
/// A new context is issued for every call; the token behind it may rotate
/// between calls, so contexts are not meant to be stored.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    access_token: String,
    scopes: Vec<String>,
    expires_at: DateTime<Utc>,
}

impl AuthorizationContext {
    pub(crate) fn new(access_token: String, scopes: Vec<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            scopes,
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Value for an `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Stamps an outgoing request with the bearer token.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.access_token)
    }
}

impl fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationContext")
            .field("access_token", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
