//! Google Calendar, Docs and Meet clients for end users.
//!
//! Adapters never see raw credentials. Each call asks a
//! [`CredentialManager`] for an authorization, which refreshes the access
//! token when it is about to expire and writes the new token back into the
//! caller's storage.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use gservices::{CredentialMap, Method};
//!
//! gservices::configure(|config| {
//!     config.client_id = Some("my-client".into());
//!     config.client_secret = Some("my-secret".into());
//! });
//!
//! let creds = Arc::new(Mutex::new(CredentialMap::from_json(stored_json)));
//! let calendar = gservices::calendar(creds, None)?;
//! let events: serde_json::Value = calendar
//!     .request(Method::GET, &calendar.calendar_path("events"), &[], None::<&()>)
//!     .await?;
//! ```

pub mod defaults;
pub mod services;

pub use defaults::{configuration, configure, reset_configuration, set_configuration};
pub use services::{Calendar, Docs, Meet, ServiceAdapter, ServiceSession};

pub use gservices_auth::{
    AuthConfig, AuthorizationContext, CredentialManager, CredentialMap, CredentialRecord,
    CredentialSource, CredentialState, Error, ErrorKind, Result, SharedSource,
};
pub use gservices_core::{TracingConfig, TracingOutputFormat, init_tracing};
pub use reqwest::Method;

/// Calendar adapter built from the default configuration.
///
/// Without a `calendar_id` the configured default calendar is used.
pub fn calendar(source: SharedSource, calendar_id: Option<&str>) -> Result<Calendar> {
    Calendar::new(&configuration(), source, calendar_id)
}

/// Docs adapter built from the default configuration.
pub fn docs(source: SharedSource) -> Result<Docs> {
    Docs::new(&configuration(), source)
}

/// Meet adapter built from the default configuration.
pub fn meet(source: SharedSource) -> Result<Meet> {
    Meet::new(&configuration(), source)
}
