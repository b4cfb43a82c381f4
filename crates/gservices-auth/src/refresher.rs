//! Freshness checks and access-token refresh.
//!
//! [`TokenRefresher`] decides, for a [`CredentialRecord`], whether the access
//! token can be used as is, must be refreshed, or cannot be refreshed at all.
//! The decision is an ordinary value ([`Freshness`]); only genuine failures are
//! reported as errors.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::credentials::CredentialRecord;
use crate::error::{Error, Result};

/// A boxed future, used at the token endpoint seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const MISSING_REFRESH_TOKEN_MESSAGE: &str =
    "Missing Google refresh token. Please re-authenticate with Google.";

const EXPIRED_AUTHORIZATION_MESSAGE: &str =
    "Your Google authorization has expired. Please sign in again.";

/// Values returned by a successful refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the server rotated the refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("rotated", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// An authorization server that can mint access tokens from refresh tokens.
pub trait TokenEndpoint: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<RefreshedToken>>;
}

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The access token is usable beyond the expiry buffer.
    Fresh,
    /// The access token expires within the buffer and can be refreshed.
    Stale,
    /// There is no refresh token to renew the access token with.
    Unrefreshable,
}

impl Freshness {
    /// Classifies `record` at `now`.
    ///
    /// A missing refresh token is reported first, whatever the expiry. A
    /// token whose expiry is unknown, or whose deadline cannot be
    /// represented, counts as stale.
    pub fn evaluate(record: &CredentialRecord, now: DateTime<Utc>, buffer: Duration) -> Self {
        if record.refresh_token.is_none() {
            return Self::Unrefreshable;
        }
        let deadline = now.checked_add_signed(buffer);
        match (record.expires_at(), deadline) {
            (Some(expires_at), Some(deadline))
                if expires_at >= deadline && record.access_token.is_some() =>
            {
                Self::Fresh
            }
            _ => Self::Stale,
        }
    }
}

/// Checks freshness and performs refresh calls against a [`TokenEndpoint`].
#[derive(Clone)]
pub struct TokenRefresher {
    endpoint: Arc<dyn TokenEndpoint>,
    buffer: Duration,
}

impl TokenRefresher {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, buffer: Duration) -> Self {
        Self { endpoint, buffer }
    }

    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    pub fn freshness(&self, record: &CredentialRecord) -> Freshness {
        Freshness::evaluate(record, Utc::now(), self.buffer)
    }

    /// Issues exactly one refresh call for `record`.
    ///
    /// Any failure of the call becomes [`ErrorKind::TokenExpired`]; there is
    /// no retry. The record itself is never modified here.
    ///
    /// [`ErrorKind::TokenExpired`]: crate::error::ErrorKind::TokenExpired
    pub async fn refresh(&self, record: &CredentialRecord) -> Result<RefreshedToken> {
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::missing_token(MISSING_REFRESH_TOKEN_MESSAGE))?;

        debug!(
            expires_at = ?record.expires_at(),
            buffer_secs = self.buffer.num_seconds(),
            "access token is stale, refreshing"
        );

        match self.endpoint.refresh(refresh_token).await {
            Ok(refreshed) => {
                let within_buffer = Utc::now()
                    .checked_add_signed(self.buffer)
                    .is_none_or(|deadline| refreshed.expires_at < deadline);
                if within_buffer {
                    warn!(
                        expires_at = %refreshed.expires_at,
                        "refreshed access token already expires within the buffer"
                    );
                }
                Ok(refreshed)
            }
            Err(e) => {
                warn!(error = %e, "access token refresh failed");
                Err(token_expired(e))
            }
        }
    }
}

/// Wraps a refresh failure, keeping the original message and cause.
pub(crate) fn token_expired(cause: Error) -> Error {
    Error::token_expired(format!(
        "{} ({})",
        EXPIRED_AUTHORIZATION_MESSAGE,
        cause.message()
    ))
    .with_source(cause)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// A token endpoint that replays scripted responses and counts calls.
    pub struct ScriptedEndpoint {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        respond: Box<dyn Fn(usize) -> Result<RefreshedToken> + Send + Sync>,
        delay: Option<std::time::Duration>,
    }

    impl ScriptedEndpoint {
        pub fn new<F>(respond: F) -> Self
        where
            F: Fn(usize) -> Result<RefreshedToken> + Send + Sync + 'static,
        {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                respond: Box::new(respond),
                delay: None,
            }
        }

        /// Always succeeds with `access_token`, valid for one hour.
        pub fn succeeding(access_token: &'static str, rotated: Option<&'static str>) -> Self {
            Self::new(move |_| {
                Ok(RefreshedToken {
                    access_token: access_token.to_string(),
                    refresh_token: rotated.map(str::to_string),
                    expires_at: Utc::now() + Duration::hours(1),
                })
            })
        }

        pub fn failing(message: &'static str) -> Self {
            Self::new(move |_| Err(Error::generic(message)))
        }

        pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen_refresh_tokens(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl TokenEndpoint for ScriptedEndpoint {
        fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<RefreshedToken>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                self.seen.lock().unwrap().push(refresh_token.to_string());
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                (self.respond)(call)
            })
        }
    }
}
