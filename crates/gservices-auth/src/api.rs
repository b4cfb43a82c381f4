//! Thin JSON client for Google REST APIs.
//!
//! Calls are authorized with an [`AuthorizationContext`] and fail with a raw
//! [`ProviderFailure`]; classification into the error taxonomy is left to
//! [`with_error_handling`](crate::mapping::with_error_handling).

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::AuthorizationContext;
use crate::error::{Error, Result};
use crate::mapping::ProviderFailure;

/// Result of a single provider call.
pub type ApiResult<T> = std::result::Result<T, ProviderFailure>;

/// A REST client rooted at one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::configuration(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Re-roots the client, keeping its HTTP settings.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &AuthorizationContext,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.request(ctx, Method::GET, path, query, None::<&Value>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &AuthorizationContext,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.request(ctx, Method::POST, path, &[], Some(body)).await
    }

    /// Sends one authorized request and decodes its JSON body.
    ///
    /// An empty body (e.g. `204 No Content`) decodes as JSON `null`.
    pub async fn request<T, B>(
        &self,
        ctx: &AuthorizationContext,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, %url, "calling provider");

        let mut request = ctx.authorize(self.http_client.request(method, &url));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_failure)?;

        if !status.is_success() {
            let message = google_error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), %message, "provider returned an error");
            return Err(ProviderFailure::from_status(status.as_u16(), message));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| ProviderFailure::Other {
            message: format!("failed to parse response: {}", e),
            source: Some(Box::new(e)),
        })
    }
}

fn transport_failure(err: reqwest::Error) -> ProviderFailure {
    let message = if err.is_timeout() {
        "request timeout".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("request failed: {}", err)
    };
    ProviderFailure::Other {
        message,
        source: Some(Box::new(err)),
    }
}

/// Pulls `error.message` out of a Google error body.
///
/// Handles both `{"error": {"message": ..}}` and the OAuth-style
/// `{"error": "code", "error_description": ..}`.
fn google_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(code) => Some(
            value
                .get("error_description")
                .and_then(Value::as_str)
                .map(|d| format!("{}: {}", code, d))
                .unwrap_or_else(|| code.clone()),
        ),
        _ => None,
    }
}
