//! Error taxonomy shared by the credential manager and the service adapters.
//!
//! Every failure surfaced to callers is an [`Error`] tagged with an
//! [`ErrorKind`]. Kinds form a small hierarchy: token problems are a kind of
//! authorization failure, not-found and quota failures are a kind of API
//! failure, and every kind is a kind of [`ErrorKind::Generic`]. Callers should
//! branch on [`Error::kind`] or [`Error::is`], never on message text.

use std::fmt;
use thiserror::Error;

/// The category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials or client configuration are incomplete.
    Configuration,
    /// No refresh token is available to renew the access token.
    MissingToken,
    /// Refreshing the access token failed; the user must sign in again.
    TokenExpired,
    /// The provider rejected the call as unauthorized.
    Authorization,
    /// The provider reported 404.
    NotFound,
    /// The provider reported 429.
    QuotaExceeded,
    /// Any other provider-reported failure.
    Api,
    /// Anything unclassified.
    Generic,
}

impl ErrorKind {
    /// Returns the kind this kind specializes, if any.
    pub fn parent(&self) -> Option<ErrorKind> {
        match self {
            Self::MissingToken | Self::TokenExpired => Some(Self::Authorization),
            Self::NotFound | Self::QuotaExceeded => Some(Self::Api),
            Self::Configuration | Self::Authorization | Self::Api => Some(Self::Generic),
            Self::Generic => None,
        }
    }

    /// Returns true if this kind is `ancestor` or specializes it.
    pub fn is_a(&self, ancestor: ErrorKind) -> bool {
        let mut current = Some(*self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Returns true if recovering requires fresh end-user consent.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::MissingToken | Self::TokenExpired)
    }

    /// Returns a stable snake_case name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::MissingToken => "missing_token",
            Self::TokenExpired => "token_expired",
            Self::Authorization => "authorization_error",
            Self::NotFound => "not_found",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Api => "api_error",
            Self::Generic => "error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by credential handling or by a provider call.
#[derive(Debug, Error)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// HTTP status reported by the provider, when there was one.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates a missing-token error.
    pub fn missing_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingToken, message)
    }

    /// Creates a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a quota exceeded error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }

    /// Creates an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    /// Creates a generic error.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    /// Records the provider status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn with_boxed_source(
        mut self,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider status code, if known.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if this error's kind is `kind` or specializes it.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind.is_a(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::generic(message).with_source(err)
    }
}

/// A specialized Result type for gservices operations.
pub type Result<T> = std::result::Result<T, Error>;
