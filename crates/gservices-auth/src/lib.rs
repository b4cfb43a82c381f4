//! Credential lifecycle for Google APIs.
//!
//! This crate turns whatever a caller stores about a user's Google
//! authorization into an access token that is safe to use right now:
//!
//! - [`CredentialSource`] / [`CredentialMap`] - where credentials come from
//! - [`CredentialRecord`] - the normalized token triple
//! - [`TokenRefresher`] - freshness checks against an expiry buffer
//! - [`CredentialManager`] - validation, refresh, write-back
//! - [`with_error_handling`] - provider failures into [`Error`]
//!
//! # Flow
//!
//! ```text
//! caller source ──normalize──► CredentialRecord ──validate──┐
//!       ▲                                                   │
//!       │ write-back                                        ▼
//!       └──────────── refresh ◄── stale? ◄──────── CredentialManager
//!                                   │
//!                                   ▼ fresh
//!                         AuthorizationContext ──► ApiClient
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gservices_auth::{AuthConfig, CredentialManager, CredentialMap};
//!
//! let creds = CredentialMap::from_json(stored_json);
//! let manager = CredentialManager::from_source(AuthConfig::new(), creds)?;
//! let ctx = manager
//!     .authorize(["https://www.googleapis.com/auth/calendar"])
//!     .await?;
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod oauth;
pub mod refresher;

pub use api::{ApiClient, ApiResult};
pub use config::{AuthConfig, CLIENT_ID_ENV, CLIENT_SECRET_ENV, OAuthCredentials};
pub use context::AuthorizationContext;
pub use credentials::{
    CredentialMap, CredentialRecord, CredentialSource, SetAccessToken, SetAccessTokenExpiresAt,
    SetRefreshToken, SharedSource, WriteBackCapabilities,
};
pub use error::{Error, ErrorKind, Result};
pub use manager::{CredentialManager, CredentialState};
pub use mapping::{ProviderFailure, with_error_handling};
pub use oauth::OAuthClient;
pub use refresher::{BoxFuture, Freshness, RefreshedToken, TokenEndpoint, TokenRefresher};

pub use gservices_core::{Expiry, ExpiryValue};
