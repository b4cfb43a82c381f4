//! Service adapters.
//!
//! An adapter pairs a [`CredentialManager`] with one or more REST roots and
//! a fixed scope set. Every remote call goes through [`ServiceSession::call`]:
//! authorize (refreshing if needed), send, then map any provider failure
//! into the error taxonomy.

mod calendar;
mod docs;
mod meet;

pub use calendar::Calendar;
pub use docs::Docs;
pub use meet::Meet;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gservices_auth::{
    ApiClient, ApiResult, AuthConfig, AuthorizationContext, CredentialManager, Result,
    SharedSource, with_error_handling,
};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
pub const DOCUMENTS_SCOPE: &str = "https://www.googleapis.com/auth/documents";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const MEET_SPACE_CREATED_SCOPE: &str =
    "https://www.googleapis.com/auth/meetings.space.created";

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const MEET_API_BASE: &str = "https://meet.googleapis.com/v2";

/// Timeout for a single provider call.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// A client of one Google service.
pub trait ServiceAdapter {
    /// Short service name, used in logs.
    const NAME: &'static str;

    /// Scopes requested for every call this adapter makes.
    const SCOPES: &'static [&'static str];

    fn session(&self) -> &ServiceSession;

    /// The manager backing this adapter.
    fn manager(&self) -> &Arc<CredentialManager> {
        self.session().manager()
    }
}

/// The credential half of an adapter.
#[derive(Debug, Clone)]
pub struct ServiceSession {
    manager: Arc<CredentialManager>,
}

impl ServiceSession {
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        Self { manager }
    }

    /// Builds a manager for `source` from `config`.
    pub fn open(config: &AuthConfig, source: SharedSource) -> Result<Self> {
        let manager = CredentialManager::new(config.clone(), source)?;
        Ok(Self::new(Arc::new(manager)))
    }

    pub fn manager(&self) -> &Arc<CredentialManager> {
        &self.manager
    }

    /// Authorizes for `scopes`, then runs `call` with the fresh context.
    ///
    /// Credential failures are returned as they are; provider failures are
    /// classified on the way out.
    pub async fn call<T, F, Fut>(&self, scopes: &[&str], call: F) -> Result<T>
    where
        F: FnOnce(AuthorizationContext) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let ctx = self.manager.authorize(scopes.iter().copied()).await?;
        with_error_handling(call(ctx)).await
    }
}

/// Sends an authorized request for `adapter` relative to `api`'s root.
async fn send<A, T, B>(
    adapter: &A,
    api: &ApiClient,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&B>,
) -> Result<T>
where
    A: ServiceAdapter,
    T: DeserializeOwned,
    B: Serialize + ?Sized,
{
    debug!(service = A::NAME, %method, path, "sending provider request");
    adapter
        .session()
        .call(A::SCOPES, |ctx| async move {
            api.request(&ctx, method, path, query, body).await
        })
        .await
}

fn api_client(base_url: &str) -> Result<ApiClient> {
    debug!(base_url, "creating API client");
    ApiClient::new(base_url, API_TIMEOUT)
}
