//! Translation of provider failures into the error taxonomy.
//!
//! Adapters report raw failures as [`ProviderFailure`]; wrapping the call in
//! [`with_error_handling`] turns them into [`Error`]s. Errors that are
//! already classified pass through unchanged.

use std::future::Future;

use thiserror::Error as ThisError;
use tracing::debug;

use crate::error::{Error, Result};

/// A raw failure reported by a service provider.
#[derive(Debug, ThisError)]
pub enum ProviderFailure {
    /// The provider rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered with a non-success status.
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    /// Anything else: transport problems, malformed bodies.
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProviderFailure {
    /// Classifies an HTTP status. `401` becomes [`ProviderFailure::Unauthorized`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 401 {
            Self::Unauthorized(message)
        } else {
            Self::Status { status, message }
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    /// The provider status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Other { .. } => None,
        }
    }
}

impl From<ProviderFailure> for Error {
    fn from(failure: ProviderFailure) -> Self {
        match failure {
            ProviderFailure::Unauthorized(message) => {
                Error::authorization(message).with_status(401)
            }
            ProviderFailure::Status { status: 404, message } => {
                Error::not_found(message).with_status(404)
            }
            ProviderFailure::Status { status: 429, message } => {
                Error::quota_exceeded(message).with_status(429)
            }
            ProviderFailure::Status { status, message } => {
                Error::api(format!("{}: {}", status, message)).with_status(status)
            }
            ProviderFailure::Other {
                message,
                source: Some(source),
            } => Error::generic(message).with_boxed_source(source),
            ProviderFailure::Other {
                message,
                source: None,
            } => Error::generic(message),
        }
    }
}

/// Runs a provider call and converts its failure into an [`Error`].
pub async fn with_error_handling<F, T, E>(call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<Error>,
{
    call.await.map_err(|e| {
        let err = e.into();
        debug!(kind = %err.kind(), status = ?err.status(), "provider call failed");
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn failing(failure: ProviderFailure) -> Error {
        with_error_handling(async { Err::<(), _>(failure) })
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized_becomes_authorization_error() {
        let err = failing(ProviderFailure::from_status(401, "Invalid Credentials")).await;
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "Invalid Credentials");
    }

    #[tokio::test]
    async fn status_codes_map_to_kinds() {
        let err = failing(ProviderFailure::from_status(404, "Not Found")).await;
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Not Found");

        let err = failing(ProviderFailure::from_status(429, "Rate Limit Exceeded")).await;
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
        assert!(err.is(ErrorKind::Api));

        let err = failing(ProviderFailure::from_status(500, "Backend Error")).await;
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.message().contains("500"));
        assert!(err.message().contains("Backend Error"));

        let err = failing(ProviderFailure::from_status(403, "Forbidden")).await;
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn other_failures_are_generic() {
        let err = failing(ProviderFailure::other("connection reset")).await;
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "connection reset");
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn other_failures_keep_their_cause() {
        use std::error::Error as _;

        let failure = ProviderFailure::Other {
            message: "bad body".to_string(),
            source: Some(Box::new(std::io::Error::other("eof"))),
        };
        let err = failing(failure).await;
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("eof"));
    }

    #[tokio::test]
    async fn classified_errors_pass_through() {
        let err = with_error_handling(async {
            Err::<(), Error>(Error::token_expired("sign in again"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenExpired);
        assert_eq!(err.message(), "sign in again");
    }

    #[tokio::test]
    async fn success_is_untouched() {
        let value = with_error_handling(async { Ok::<_, ProviderFailure>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn failure_status() {
        assert_eq!(ProviderFailure::from_status(401, "x").status(), Some(401));
        assert_eq!(ProviderFailure::other("x").status(), None);
        assert_eq!(
            ProviderFailure::from_status(503, "down").to_string(),
            "status 503: down"
        );
    }
}
