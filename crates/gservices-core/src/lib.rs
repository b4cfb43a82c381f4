//! Shared building blocks for the gservices crates.
//!
//! - [`expiry`] - coercion of heterogeneous expiry timestamps
//! - [`tracing`](mod@crate::tracing) - subscriber setup for host applications

pub mod expiry;
pub mod tracing;

pub use expiry::{Expiry, ExpiryValue};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
