//! Tracing subscriber setup for binaries and tests embedding lifeline.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application. These helpers cover the common case.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "lifeline=info";

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Builds the filter: `RUST_LOG` when set and valid, else `default_filter`.
#[must_use]
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a global stderr subscriber.
///
/// Returns false if a global subscriber was already installed.
pub fn try_init_tracing(default_filter: &str, format: LogFormat) -> bool {
    let filter = env_filter(default_filter);
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}

/// Installs a global stderr subscriber, ignoring an existing one.
pub fn init_tracing(default_filter: &str) {
    let _ = try_init_tracing(default_filter, LogFormat::Pretty);
}
