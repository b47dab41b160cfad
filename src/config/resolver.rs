//! Precedence resolution for client configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Explicit overrides passed by the host application
//! 2. `LIFEPLAN_API_URL` environment variable (base URL only)
//! 3. config.kdl
//! 4. Built-in defaults

use std::time::Duration;

use crate::Result;
use crate::config::schema::{
    ClientConfig, ClientSettings, DEFAULT_API_BASE_URL, DEFAULT_FRESHNESS_WINDOW_SECS,
    DEFAULT_HEALTH_PATH, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, validate_base_url,
};

/// Environment variable name for the base URL override.
pub const API_URL_ENV: &str = "LIFEPLAN_API_URL";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    File,
    /// Value passed explicitly by the host
    Override,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "file"),
            ValueSource::Override => write!(f, "override"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved client configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base_url: Resolved<String>,
    pub request_timeout_ms: Resolved<u64>,
    pub probe_timeout_ms: Resolved<u64>,
    pub freshness_window_secs: Resolved<u64>,
    pub health_path: Resolved<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_base_url: Resolved::new(DEFAULT_API_BASE_URL.to_string(), ValueSource::Default),
            request_timeout_ms: Resolved::new(DEFAULT_REQUEST_TIMEOUT_MS, ValueSource::Default),
            probe_timeout_ms: Resolved::new(DEFAULT_PROBE_TIMEOUT_MS, ValueSource::Default),
            freshness_window_secs: Resolved::new(
                DEFAULT_FRESHNESS_WINDOW_SECS,
                ValueSource::Default,
            ),
            health_path: Resolved::new(DEFAULT_HEALTH_PATH.to_string(), ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Flatten into the settings the client context runs with.
    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            api_base_url: self.api_base_url.value.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(self.request_timeout_ms.value),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms.value),
            freshness_window: Duration::from_secs(self.freshness_window_secs.value),
            health_path: self.health_path.value.clone(),
        }
    }
}

/// Resolve configuration with the full precedence chain.
///
/// `overrides` is treated like a config layer above the environment; its
/// values are validated the same way as the file's.
pub fn resolve_config(file: &ClientConfig, overrides: &ClientConfig) -> Result<ResolvedConfig> {
    file.validate().map_err(crate::Error::Config)?;
    overrides.validate().map_err(crate::Error::Config)?;

    let mut result = ResolvedConfig::default();

    if let Some(ref url) = overrides.api_base_url {
        result.api_base_url = Resolved::new(url.clone(), ValueSource::Override);
    } else if let Some(url) = env_api_url()? {
        result.api_base_url = Resolved::new(url, ValueSource::EnvVar(API_URL_ENV.to_string()));
    } else if let Some(ref url) = file.api_base_url {
        result.api_base_url = Resolved::new(url.clone(), ValueSource::File);
    }

    result.request_timeout_ms = pick(
        overrides.request_timeout_ms,
        file.request_timeout_ms,
        result.request_timeout_ms,
    );
    result.probe_timeout_ms = pick(
        overrides.probe_timeout_ms,
        file.probe_timeout_ms,
        result.probe_timeout_ms,
    );
    result.freshness_window_secs = pick(
        overrides.freshness_window_secs,
        file.freshness_window_secs,
        result.freshness_window_secs,
    );
    result.health_path = pick(
        overrides.health_path.clone(),
        file.health_path.clone(),
        result.health_path,
    );

    Ok(result)
}

fn pick<T>(over: Option<T>, file: Option<T>, default: Resolved<T>) -> Resolved<T> {
    match (over, file) {
        (Some(v), _) => Resolved::new(v, ValueSource::Override),
        (None, Some(v)) => Resolved::new(v, ValueSource::File),
        (None, None) => default,
    }
}

fn env_api_url() -> Result<Option<String>> {
    match std::env::var(API_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => {
            validate_base_url(&url).map_err(crate::Error::Config)?;
            Ok(Some(url))
        }
        _ => Ok(None),
    }
}
