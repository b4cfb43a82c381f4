//! Tracing setup for gservices.
//!
//! The library crates only emit events through the `tracing` macros. Host
//! applications that do not install their own subscriber can call
//! [`init_tracing`] once at startup.
//!
//! ```ignore
//! use gservices_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Target prefix shared by every crate in the workspace.
const TARGET_PREFIX: &str = "gservices";

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The custom filter directive did not parse
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single-line human readable output (default)
    #[default]
    Compact,
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per event
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to gservices targets when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log lines
    pub output_format: TracingOutputFormat,
    /// Include file/line information
    pub include_location: bool,
    /// Include the module path of the event
    pub include_target: bool,
    /// Include timestamps (compact format only)
    pub include_timestamp: bool,
    /// Custom filter directive, overrides both RUST_LOG and `default_level`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Debug-level output with source locations, for troubleshooting refreshes.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            ..Self::default()
        }
    }

    /// JSON output for log collectors.
    #[must_use]
    pub fn structured() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_location: true,
            ..Self::default()
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directive used when neither `env_filter` nor RUST_LOG is set.
    pub fn default_directive(&self) -> String {
        format!(
            "{}={}",
            TARGET_PREFIX,
            self.default_level.as_str().to_lowercase()
        )
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Install a global subscriber built from `config`.
///
/// # Errors
///
/// Fails if a global subscriber is already set or the custom filter
/// directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.build_filter()?)
        .with(fmt_layer(&config));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn fmt_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingOutputFormat::Pretty, _) => layer.pretty().boxed(),
        (TracingOutputFormat::Json, _) => layer.json().boxed(),
    }
}
