//! Process-wide default configuration.
//!
//! The credential manager itself always takes an explicit [`AuthConfig`].
//! This holder only backs the convenience factories in this crate.

use std::sync::{OnceLock, PoisonError, RwLock};

use gservices_auth::AuthConfig;
use tracing::debug;

static CONFIGURATION: OnceLock<RwLock<AuthConfig>> = OnceLock::new();

fn holder() -> &'static RwLock<AuthConfig> {
    CONFIGURATION.get_or_init(|| RwLock::new(AuthConfig::default()))
}

/// Edits the default configuration in place.
///
/// ```ignore
/// gservices::configure(|config| {
///     config.client_id = Some("my-client".into());
///     config.token_expiry_buffer_secs = 120;
/// });
/// ```
pub fn configure<F>(edit: F)
where
    F: FnOnce(&mut AuthConfig),
{
    let mut config = holder().write().unwrap_or_else(PoisonError::into_inner);
    edit(&mut config);
    debug!(
        buffer_secs = config.token_expiry_buffer_secs,
        calendar = %config.default_calendar_id,
        "default configuration updated"
    );
}

/// Returns a copy of the default configuration.
pub fn configuration() -> AuthConfig {
    holder()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the default configuration wholesale.
pub fn set_configuration(config: AuthConfig) {
    configure(|current| *current = config);
}

pub fn reset_configuration() {
    set_configuration(AuthConfig::default());
}
