use std::sync::Arc;

use gservices_auth::{ApiClient, AuthConfig, CredentialManager, Result, SharedSource};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    CALENDAR_API_BASE, CALENDAR_EVENTS_SCOPE, CALENDAR_SCOPE, ServiceAdapter, ServiceSession,
    api_client, send,
};

/// Google Calendar, bound to one calendar.
#[derive(Debug, Clone)]
pub struct Calendar {
    session: ServiceSession,
    calendar_id: String,
    api: ApiClient,
}

impl ServiceAdapter for Calendar {
    const NAME: &'static str = "calendar";
    const SCOPES: &'static [&'static str] = &[CALENDAR_SCOPE, CALENDAR_EVENTS_SCOPE];

    fn session(&self) -> &ServiceSession {
        &self.session
    }
}

impl Calendar {
    /// Creates an adapter with its own credential manager.
    ///
    /// `calendar_id` defaults to the configured default calendar.
    pub fn new(
        config: &AuthConfig,
        source: SharedSource,
        calendar_id: Option<&str>,
    ) -> Result<Self> {
        let session = ServiceSession::open(config, source)?;
        Self::from_session(session, calendar_id)
    }

    /// Creates an adapter over an existing manager.
    pub fn with_manager(
        manager: Arc<CredentialManager>,
        calendar_id: Option<&str>,
    ) -> Result<Self> {
        Self::from_session(ServiceSession::new(manager), calendar_id)
    }

    fn from_session(session: ServiceSession, calendar_id: Option<&str>) -> Result<Self> {
        let calendar_id = calendar_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| session.manager().config().default_calendar_id.clone());

        Ok(Self {
            session,
            calendar_id,
            api: api_client(CALENDAR_API_BASE)?,
        })
    }

    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api = self.api.with_base_url(base_url);
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Path below this calendar, e.g. `events` gives `calendars/primary/events`.
    pub fn calendar_path(&self, suffix: &str) -> String {
        let base = format!("calendars/{}", urlencoding::encode(&self.calendar_id));
        match suffix.trim_start_matches('/') {
            "" => base,
            rest => format!("{}/{}", base, rest),
        }
    }

    /// Sends an authorized request relative to the Calendar API root.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        send(self, &self.api, method, path, query, body).await
    }
}
