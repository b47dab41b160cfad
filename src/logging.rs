//! Tracing subscriber setup for host applications and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the embedding application, which can call [`init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted first for the log filter.
pub const LOG_ENV: &str = "LIFEPLAN_LOG";

/// Build the filter: `LIFEPLAN_LOG`, then `RUST_LOG`, then `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install a formatted subscriber writing to stderr.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Install a JSON subscriber, for hosts that ship logs to a collector.
pub fn init_json(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
