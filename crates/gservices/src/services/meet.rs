use std::sync::Arc;

use gservices_auth::{ApiClient, AuthConfig, CredentialManager, Result, SharedSource};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    CALENDAR_API_BASE, CALENDAR_EVENTS_SCOPE, CALENDAR_SCOPE, MEET_API_BASE,
    MEET_SPACE_CREATED_SCOPE, ServiceAdapter, ServiceSession, api_client, send,
};

/// Google Meet.
///
/// Meetings scheduled with a time are calendar events carrying conference
/// data, so this adapter also talks to the Calendar API, always on the
/// configured default calendar. Standalone spaces go through the Meet API.
#[derive(Debug, Clone)]
pub struct Meet {
    session: ServiceSession,
    calendar: ApiClient,
    meet: ApiClient,
}

impl ServiceAdapter for Meet {
    const NAME: &'static str = "meet";
    const SCOPES: &'static [&'static str] =
        &[CALENDAR_SCOPE, CALENDAR_EVENTS_SCOPE, MEET_SPACE_CREATED_SCOPE];

    fn session(&self) -> &ServiceSession {
        &self.session
    }
}

impl Meet {
    pub fn new(config: &AuthConfig, source: SharedSource) -> Result<Self> {
        Self::from_session(ServiceSession::open(config, source)?)
    }

    pub fn with_manager(manager: Arc<CredentialManager>) -> Result<Self> {
        Self::from_session(ServiceSession::new(manager))
    }

    fn from_session(session: ServiceSession) -> Result<Self> {
        Ok(Self {
            session,
            calendar: api_client(CALENDAR_API_BASE)?,
            meet: api_client(MEET_API_BASE)?,
        })
    }

    pub fn with_api_bases(mut self, calendar: impl Into<String>, meet: impl Into<String>) -> Self {
        self.calendar = self.calendar.with_base_url(calendar);
        self.meet = self.meet.with_base_url(meet);
        self
    }

    /// Path of the default calendar's event collection.
    pub fn events_path(&self) -> String {
        let calendar_id = &self.session.manager().config().default_calendar_id;
        format!("calendars/{}/events", urlencoding::encode(calendar_id))
    }

    /// Sends an authorized request relative to the Calendar API root.
    pub async fn calendar_request<T, B>(
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
        send(self, &self.calendar, method, path, query, body).await
    }

    /// Sends an authorized request relative to the Meet API root.
    pub async fn meet_request<T, B>(
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
        send(self, &self.meet, method, path, query, body).await
    }
}
