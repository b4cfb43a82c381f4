use std::sync::Arc;

use gservices_auth::{ApiClient, AuthConfig, CredentialManager, Result, SharedSource};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    DOCS_API_BASE, DOCUMENTS_SCOPE, DRIVE_API_BASE, DRIVE_SCOPE, ServiceAdapter, ServiceSession,
    api_client, send,
};

/// Google Docs, with Drive for file metadata and placement.
#[derive(Debug, Clone)]
pub struct Docs {
    session: ServiceSession,
    docs: ApiClient,
    drive: ApiClient,
}

impl ServiceAdapter for Docs {
    const NAME: &'static str = "docs";
    const SCOPES: &'static [&'static str] = &[DOCUMENTS_SCOPE, DRIVE_SCOPE];

    fn session(&self) -> &ServiceSession {
        &self.session
    }
}

impl Docs {
    pub fn new(config: &AuthConfig, source: SharedSource) -> Result<Self> {
        Self::from_session(ServiceSession::open(config, source)?)
    }

    pub fn with_manager(manager: Arc<CredentialManager>) -> Result<Self> {
        Self::from_session(ServiceSession::new(manager))
    }

    fn from_session(session: ServiceSession) -> Result<Self> {
        Ok(Self {
            session,
            docs: api_client(DOCS_API_BASE)?,
            drive: api_client(DRIVE_API_BASE)?,
        })
    }

    pub fn with_api_bases(mut self, docs: impl Into<String>, drive: impl Into<String>) -> Self {
        self.docs = self.docs.with_base_url(docs);
        self.drive = self.drive.with_base_url(drive);
        self
    }

    /// Sends an authorized request relative to the Docs API root.
    pub async fn docs_request<T, B>(
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
        send(self, &self.docs, method, path, query, body).await
    }

    /// Sends an authorized request relative to the Drive API root.
    pub async fn drive_request<T, B>(
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
        send(self, &self.drive, method, path, query, body).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use chrono::{Duration, Utc};
    use gservices_auth::{CredentialMap, ErrorKind};
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn docs_for(server: &MockServer) -> Docs {
        let map = CredentialMap::new()
            .with("google_token", "A1")
            .with("google_refresh_token", "R1")
            .with(
                "google_token_expires_at",
                (Utc::now() + Duration::hours(1)).to_rfc3339(),
            );
        let config = AuthConfig::new()
            .with_client_id("client-1")
            .with_client_secret("secret-1")
            .with_site(server.uri());

        Docs::new(&config, Arc::new(Mutex::new(map)))
            .unwrap()
            .with_api_bases(format!("{}/docs", server.uri()), format!("{}/drive", server.uri()))
    }

    #[test]
    fn scopes() {
        assert_eq!(
            Docs::SCOPES,
            &[
                "https://www.googleapis.com/auth/documents",
                "https://www.googleapis.com/auth/drive"
            ]
        );
    }

    #[tokio::test]
    async fn routes_to_docs_and_drive() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/documents"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documentId": "d1",
                "title": "Notes"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/files/d1"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "webViewLink": "https://docs.google.com/document/d/d1/edit"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let docs = docs_for(&server);
        let created: Value = docs
            .docs_request(Method::POST, "documents", &[], Some(&json!({ "title": "Notes" })))
            .await
            .unwrap();
        assert_eq!(created["documentId"], "d1");

        let file: Value = docs
            .drive_request::<_, Value>(
                Method::GET,
                "files/d1",
                &[("fields", "webViewLink".to_string())],
                None,
            )
            .await
            .unwrap();
        assert!(file["webViewLink"].as_str().unwrap().contains("d1"));
    }

    #[tokio::test]
    async fn quota_errors_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/files"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "User rate limit exceeded." }
            })))
            .mount(&server)
            .await;

        let err = docs_for(&server)
            .drive_request::<Value, Value>(Method::GET, "files", &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.message(), "User rate limit exceeded.");
    }
}
