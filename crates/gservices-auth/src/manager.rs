//! The credential manager.
//!
//! A [`CredentialManager`] owns one user's credentials for its whole
//! lifetime:
//!
//! ```text
//! Validated ──► Fresh ◄──────────────┐
//!     │                              │ next check
//!     └──────► Stale ──► Refreshing ──► RefreshedFresh
//!                            │
//!                            └──► RefreshFailed (terminal)
//! ```
//!
//! Every call to [`CredentialManager::authorize`] runs the freshness check,
//! the refresh if one is needed, and the write-back to completion before an
//! [`AuthorizationContext`] is returned. The internal record lock is held for
//! that whole sequence, so a manager never has more than one refresh in
//! flight.
//!
//! # Write-back consistency
//!
//! Refreshed values are written to the caller's source only through the
//! setters it exposes, while the manager's own record is always updated. A
//! source that accepts a new access token but not a rotated refresh token
//! therefore drifts from the manager's copy. This mirrors sources that keep
//! their refresh token read-only and is left to the caller to reconcile.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::context::AuthorizationContext;
use crate::credentials::{CredentialRecord, CredentialSource, SharedSource, WriteBackCapabilities};
use crate::error::{Error, Result};
use crate::oauth::OAuthClient;
use crate::refresher::{
    Freshness, MISSING_REFRESH_TOKEN_MESSAGE, RefreshedToken, TokenEndpoint, TokenRefresher,
};

/// Where a manager's credential is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Constructed and validated, not yet checked.
    Validated,
    /// Last check found the access token usable.
    Fresh,
    /// Last check found the access token within the expiry buffer.
    Stale,
    /// A refresh call is in progress.
    Refreshing,
    /// The last refresh succeeded.
    RefreshedFresh,
    /// A refresh failed. No further refresh is attempted.
    RefreshFailed,
}

#[derive(Debug)]
struct Inner {
    record: CredentialRecord,
    state: CredentialState,
    last_failure: Option<String>,
}

/// Normalizes, validates and keeps one user's credentials fresh.
pub struct CredentialManager {
    config: AuthConfig,
    source: SharedSource,
    capabilities: WriteBackCapabilities,
    refresher: TokenRefresher,
    inner: AsyncMutex<Inner>,
}

impl CredentialManager {
    /// Creates a manager that refreshes against the configured
    /// authorization server.
    ///
    /// Fails with a configuration error if any credential field is missing
    /// or if no OAuth client credentials can be resolved.
    pub fn new(config: AuthConfig, source: SharedSource) -> Result<Self> {
        let (record, capabilities) = Self::load(&source)?;
        config.validate()?;
        let client = OAuthClient::new(config.resolve_credentials()?, &config)?;
        Ok(Self::assemble(config, source, record, capabilities, Arc::new(client)))
    }

    /// Creates a manager over a source the caller does not need to observe.
    pub fn from_source<S>(config: AuthConfig, source: S) -> Result<Self>
    where
        S: CredentialSource + 'static,
    {
        Self::new(config, Arc::new(Mutex::new(source)))
    }

    /// Creates a manager that refreshes through `endpoint`.
    pub fn with_endpoint(
        config: AuthConfig,
        source: SharedSource,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Result<Self> {
        let (record, capabilities) = Self::load(&source)?;
        config.validate()?;
        Ok(Self::assemble(config, source, record, capabilities, endpoint))
    }

    fn load(source: &SharedSource) -> Result<(CredentialRecord, WriteBackCapabilities)> {
        let mut guard = lock_source(source);
        let record = CredentialRecord::from_source(&*guard);
        let capabilities = WriteBackCapabilities::probe(&mut *guard);
        drop(guard);

        record.validate()?;
        debug!(?capabilities, "credentials validated");
        Ok((record, capabilities))
    }

    fn assemble(
        config: AuthConfig,
        source: SharedSource,
        record: CredentialRecord,
        capabilities: WriteBackCapabilities,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Self {
        let refresher = TokenRefresher::new(endpoint, config.token_expiry_buffer());
        Self {
            config,
            source,
            capabilities,
            refresher,
            inner: AsyncMutex::new(Inner {
                record,
                state: CredentialState::Validated,
                last_failure: None,
            }),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Setters the caller's source exposed at construction.
    pub fn write_back_capabilities(&self) -> WriteBackCapabilities {
        self.capabilities
    }

    /// A snapshot of the manager's current record.
    pub async fn record(&self) -> CredentialRecord {
        self.inner.lock().await.record.clone()
    }

    pub async fn state(&self) -> CredentialState {
        self.inner.lock().await.state
    }

    /// Returns an authorization for `scopes`, refreshing the access token
    /// first if it is stale.
    pub async fn authorize<I, S>(&self, scopes: I) -> Result<AuthorizationContext>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        let mut inner = self.inner.lock().await;
        ensure_not_failed(&inner)?;

        match self.refresher.freshness(&inner.record) {
            Freshness::Unrefreshable => {
                return Err(Error::missing_token(MISSING_REFRESH_TOKEN_MESSAGE));
            }
            Freshness::Fresh => inner.state = CredentialState::Fresh,
            Freshness::Stale => {
                inner.state = CredentialState::Stale;
                self.refresh_locked(&mut inner).await?;
            }
        }

        Self::context_for(&inner.record, scopes)
    }

    /// Refreshes the access token regardless of its expiry.
    pub async fn force_refresh(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        ensure_not_failed(&inner)?;
        if inner.record.refresh_token.is_none() {
            return Err(Error::missing_token(MISSING_REFRESH_TOKEN_MESSAGE));
        }
        self.refresh_locked(&mut inner).await
    }

    async fn refresh_locked(&self, inner: &mut Inner) -> Result<()> {
        inner.state = CredentialState::Refreshing;

        match self.refresher.refresh(&inner.record).await {
            Ok(refreshed) => {
                self.write_back(&refreshed);
                apply_refresh(&mut inner.record, refreshed);
                inner.state = CredentialState::RefreshedFresh;
                info!(expires_at = ?inner.record.expires_at(), "credentials refreshed");
                Ok(())
            }
            Err(e) => {
                inner.state = CredentialState::RefreshFailed;
                inner.last_failure = Some(e.message().to_string());
                Err(e)
            }
        }
    }

    /// Pushes refreshed values into whichever setters the source exposes.
    fn write_back(&self, refreshed: &RefreshedToken) {
        if !self.capabilities.any() {
            debug!("credential source is read-only, skipping write-back");
            return;
        }

        let mut source = lock_source(&self.source);
        let mut written = Vec::with_capacity(3);
        let offered = if refreshed.refresh_token.is_some() { 3 } else { 2 };

        if let Some(setter) = source.access_token_setter() {
            setter.set_access_token(&refreshed.access_token);
            written.push("access_token");
        }
        if let Some(rotated) = refreshed.refresh_token.as_deref() {
            if let Some(setter) = source.refresh_token_setter() {
                setter.set_refresh_token(rotated);
                written.push("refresh_token");
            }
        }
        if let Some(setter) = source.expiry_setter() {
            setter.set_access_token_expires_at(refreshed.expires_at);
            written.push("access_token_expires_at");
        }

        if written.len() < offered {
            warn!(?written, "credential source accepted only part of the refresh");
        } else {
            debug!(?written, "wrote refreshed credentials back to source");
        }
    }

    fn context_for(record: &CredentialRecord, scopes: Vec<String>) -> Result<AuthorizationContext> {
        match (record.access_token.clone(), record.expires_at()) {
            (Some(token), Some(expires_at)) => {
                Ok(AuthorizationContext::new(token, scopes, expires_at))
            }
            _ => Err(Error::configuration(format!(
                "credentials must include: {}",
                record.missing_fields().join(", ")
            ))),
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("buffer", &self.refresher.buffer())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A failed refresh is final; every later call reports the same failure.
fn ensure_not_failed(inner: &Inner) -> Result<()> {
    if inner.state != CredentialState::RefreshFailed {
        return Ok(());
    }
    let message = inner
        .last_failure
        .clone()
        .unwrap_or_else(|| "a previous refresh failed".to_string());
    Err(Error::token_expired(message))
}

/// Folds a refresh into `record`, keeping the prior refresh token unless
/// the server rotated it.
fn apply_refresh(record: &mut CredentialRecord, refreshed: RefreshedToken) {
    record.access_token = Some(refreshed.access_token);
    if let Some(rotated) = refreshed.refresh_token {
        record.refresh_token = Some(rotated);
    }
    record.access_token_expires_at = Some(refreshed.expires_at.into());
}

fn lock_source(source: &SharedSource) -> MutexGuard<'_, dyn CredentialSource + 'static> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}
