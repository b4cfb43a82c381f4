//! Client configuration for the credential manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable consulted when `client_id` is not configured.
pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
/// Environment variable consulted when `client_secret` is not configured.
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

/// OAuth client credentials registered with the authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// Configuration consumed by the credential manager.
///
/// Constructed explicitly and handed to each manager. Applications that want
/// a process-wide default keep one at their outermost layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. Falls back to `GOOGLE_CLIENT_ID`.
    pub client_id: Option<String>,

    /// OAuth client secret. Falls back to `GOOGLE_CLIENT_SECRET`.
    pub client_secret: Option<String>,

    /// An access token expiring within this many seconds is refreshed
    /// before use.
    pub token_expiry_buffer_secs: u64,

    /// Calendar used by calendar adapters when none is given.
    pub default_calendar_id: String,

    /// Upper bound on a single token refresh request.
    pub refresh_timeout_secs: u64,

    /// Authorization server origin.
    pub site: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_expiry_buffer_secs: Self::DEFAULT_EXPIRY_BUFFER_SECS,
            default_calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            refresh_timeout_secs: Self::DEFAULT_REFRESH_TIMEOUT_SECS,
            site: Self::DEFAULT_SITE.to_string(),
        }
    }
}

impl AuthConfig {
    pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 60;
    /// Largest accepted expiry buffer: one day.
    pub const MAX_EXPIRY_BUFFER_SECS: u64 = 86_400;
    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";
    pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_SITE: &'static str = "https://accounts.google.com";
    pub const AUTHORIZE_PATH: &'static str = "/o/oauth2/auth";
    pub const TOKEN_PATH: &'static str = "/o/oauth2/token";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_token_expiry_buffer_secs(mut self, secs: u64) -> Self {
        self.token_expiry_buffer_secs = secs;
        self
    }

    pub fn with_default_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.default_calendar_id = calendar_id.into();
        self
    }

    pub fn with_refresh_timeout_secs(mut self, secs: u64) -> Self {
        self.refresh_timeout_secs = secs;
        self
    }

    /// Points the manager at another authorization server origin.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    /// The expiry buffer, capped at [`Self::MAX_EXPIRY_BUFFER_SECS`].
    pub fn token_expiry_buffer(&self) -> chrono::Duration {
        let secs = self.token_expiry_buffer_secs.min(Self::MAX_EXPIRY_BUFFER_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}{}", self.site.trim_end_matches('/'), Self::AUTHORIZE_PATH)
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.site.trim_end_matches('/'), Self::TOKEN_PATH)
    }

    /// Resolves client credentials, falling back to the process environment.
    pub fn resolve_credentials(&self) -> Result<OAuthCredentials> {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolves client credentials using `lookup` for unset values.
    ///
    /// Empty values count as unset.
    pub fn resolve_credentials_with<F>(&self, lookup: F) -> Result<OAuthCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, env: &str| {
            configured
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(env).filter(|v| !v.is_empty()))
        };

        let client_id = pick(&self.client_id, CLIENT_ID_ENV);
        let client_secret = pick(&self.client_secret, CLIENT_SECRET_ENV);

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(OAuthCredentials::new(id, secret)),
            (id, secret) => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push(format!("client_id (or {})", CLIENT_ID_ENV));
                }
                if secret.is_none() {
                    missing.push(format!("client_secret (or {})", CLIENT_SECRET_ENV));
                }
                Err(Error::configuration(format!(
                    "OAuth client is not configured: missing {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Validates values that do not depend on the environment.
    pub fn validate(&self) -> Result<()> {
        if !(self.site.starts_with("https://") || self.site.starts_with("http://")) {
            return Err(Error::configuration(format!(
                "site must be an http(s) origin, got {:?}",
                self.site
            )));
        }
        if self.token_expiry_buffer_secs > Self::MAX_EXPIRY_BUFFER_SECS {
            return Err(Error::configuration(format!(
                "token_expiry_buffer_secs must be at most {}, got {}",
                Self::MAX_EXPIRY_BUFFER_SECS,
                self.token_expiry_buffer_secs
            )));
        }
        if self.refresh_timeout_secs == 0 {
            return Err(Error::configuration("refresh_timeout_secs must be positive"));
        }
        Ok(())
    }
}
