//! OAuth 2.0 client for the authorization server.
//!
//! Only two endpoints are used: the token endpoint, for refreshing access
//! tokens, and the authorize endpoint, whose consent URL is built here for
//! the interactive sign-in flow that lives outside this crate.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{AuthConfig, OAuthCredentials};
use crate::error::{Error, Result};
use crate::refresher::{BoxFuture, RefreshedToken, TokenEndpoint};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// OAuth client bound to one set of client credentials.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    authorize_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client for the endpoints and timeout in `config`.
    pub fn new(credentials: OAuthCredentials, config: &AuthConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.refresh_timeout())
            .build()
            .map_err(|e| {
                Error::configuration(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            credentials,
            authorize_url: config.authorize_url(),
            token_url: config.token_url(),
            http_client,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Transport failures, non-success responses and malformed bodies are
    /// all returned as errors; the caller decides how to classify them.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!(url = %self.token_url, "requesting access token refresh");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::authorization(format!(
                "token refresh failed ({}): {}",
                status,
                describe_token_error(&body)
            ))
            .with_status(status.as_u16()));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            Error::generic(format!("invalid token response: {}", e)).with_source(e)
        })?;

        let lifetime = token_response
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = expiry_after(lifetime).ok_or_else(|| {
            Error::generic(format!(
                "invalid token response: expires_in out of range ({})",
                lifetime
            ))
        })?;

        info!(
            expires_in = lifetime,
            rotated = token_response.refresh_token.is_some(),
            "refreshed access token"
        );

        Ok(RefreshedToken {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        })
    }

    /// Builds the consent URL for an offline-access authorization request.
    pub fn authorization_url(&self, redirect_uri: &str, scopes: &[String], state: &str) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&\
            access_type=offline&prompt=consent",
            self.authorize_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }
}

impl TokenEndpoint for OAuthClient {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<RefreshedToken>> {
        Box::pin(self.refresh_token(refresh_token))
    }
}

/// Success body from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body from the token endpoint, e.g. `{"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Expiry instant for a token living `lifetime` seconds from now.
fn expiry_after(lifetime: i64) -> Option<DateTime<Utc>> {
    if lifetime <= 0 {
        return None;
    }
    Utc::now().checked_add_signed(Duration::try_seconds(lifetime)?)
}

fn describe_token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(TokenErrorResponse { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}
