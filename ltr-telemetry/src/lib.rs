//! Logging for the ltr workspace.
//!
//! Binaries call [`init_telemetry`] (human-readable) or
//! [`init_json_telemetry`] (one JSON object per line) once at start-up.
//! Both write to stderr so that reports printed on stdout stay clean, and
//! both honour `RUST_LOG` over the supplied default directive.
//!
//! Tests capture events with [`memory::InMemoryEventLayer`].

pub mod memory;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

pub use memory::{CapturedEvent, InMemoryEventLayer, SharedEventStorage, memory_subscriber};

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable subscriber on stderr.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
}

/// Install a JSON subscriber on stderr.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json_telemetry(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .try_init()
}

/// Install the human-readable subscriber and also record every event in
/// `storage`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with_storage(
    default_directive: &str,
    storage: SharedEventStorage,
) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(InMemoryEventLayer::new(storage))
        .try_init()
}
