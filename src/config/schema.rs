//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions
//! - Default values

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Default REST base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Default bounded timeout for every remote call.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default timeout for the reachability probe.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// How long an availability verdict stays fresh.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 10;

/// Reachability endpoint, relative to the base URL.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Client preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// api-base-url "http://localhost:3001/api"
/// request-timeout-ms 10000
/// probe-timeout-ms 5000
/// freshness-window-secs 10
/// health-path "/health"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST service
    pub api_base_url: Option<String>,

    /// Timeout applied to every remote call, in milliseconds
    pub request_timeout_ms: Option<u64>,

    /// Timeout applied to the reachability probe, in milliseconds
    pub probe_timeout_ms: Option<u64>,

    /// Freshness window of a cached availability verdict, in seconds
    pub freshness_window_secs: Option<u64>,

    /// Path of the reachability endpoint
    pub health_path: Option<String>,
}

impl ClientConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ref url) = self.api_base_url {
            validate_base_url(url)?;
        }
        for (name, value) in [
            ("request-timeout-ms", self.request_timeout_ms),
            ("probe-timeout-ms", self.probe_timeout_ms),
            ("freshness-window-secs", self.freshness_window_secs),
        ] {
            if value == Some(0) {
                return Err(format!("{} must be greater than 0", name));
            }
        }
        if let Some(ref path) = self.health_path {
            if !path.starts_with('/') {
                return Err(format!("health-path must start with '/', got {}", path));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_base_url: string_entry(doc, "api-base-url"),
            request_timeout_ms: u64_entry(doc, "request-timeout-ms"),
            probe_timeout_ms: u64_entry(doc, "probe-timeout-ms"),
            freshness_window_secs: u64_entry(doc, "freshness-window-secs"),
            health_path: string_entry(doc, "health-path"),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(ref url) = self.api_base_url {
            push_string(&mut doc, "api-base-url", url);
        }
        if let Some(ms) = self.request_timeout_ms {
            push_integer(&mut doc, "request-timeout-ms", ms);
        }
        if let Some(ms) = self.probe_timeout_ms {
            push_integer(&mut doc, "probe-timeout-ms", ms);
        }
        if let Some(secs) = self.freshness_window_secs {
            push_integer(&mut doc, "freshness-window-secs", secs);
        }
        if let Some(ref path) = self.health_path {
            push_string(&mut doc, "health-path", path);
        }
        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &ClientConfig) {
        if other.api_base_url.is_some() {
            self.api_base_url = other.api_base_url.clone();
        }
        if other.request_timeout_ms.is_some() {
            self.request_timeout_ms = other.request_timeout_ms;
        }
        if other.probe_timeout_ms.is_some() {
            self.probe_timeout_ms = other.probe_timeout_ms;
        }
        if other.freshness_window_secs.is_some() {
            self.freshness_window_secs = other.freshness_window_secs;
        }
        if other.health_path.is_some() {
            self.health_path = other.health_path.clone();
        }
    }

    /// Default location: `~/.config/lifeplan/config.kdl`.
    pub fn system_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lifeplan").join("config.kdl"))
    }

    /// Load config from `path`. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = read_kdl(path)?;
        let config = Self::from_kdl(&doc);
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Write config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().map_err(Error::Config)?;
        write_kdl(path, &self.to_kdl())
    }
}

/// Concrete settings the client context runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub freshness_window: Duration,
    pub health_path: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            freshness_window: Duration::from_secs(DEFAULT_FRESHNESS_WINDOW_SECS),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

/// Locally persisted session stored in state.kdl.
///
/// This is where the current user's identity is read from before every
/// remote request. **Created with 0600 permissions.**
///
/// # KDL Schema
///
/// ```kdl
/// user-id "1717171717171"
/// email "someone@example.com"
/// signed-in-at "2026-01-31T09:00:00Z"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Identifier of the signed-in user
    pub user_id: Option<String>,

    /// Email of the signed-in user
    pub email: Option<String>,

    /// When the session was established
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Create an empty (signed-out) session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for a signed-in user.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: None,
            signed_in_at: Some(Utc::now()),
        }
    }

    /// Current user id, ignoring blank values.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            user_id: string_entry(doc, "user-id"),
            email: string_entry(doc, "email"),
            signed_in_at: string_entry(doc, "signed-in-at")
                .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        }
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(ref id) = self.user_id {
            push_string(&mut doc, "user-id", id);
        }
        if let Some(ref email) = self.email {
            push_string(&mut doc, "email", email);
        }
        if let Some(ref at) = self.signed_in_at {
            push_string(&mut doc, "signed-in-at", &at.to_rfc3339());
        }
        doc
    }

    /// Default location: `~/.local/share/lifeplan/state.kdl`.
    pub fn system_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("lifeplan").join("state.kdl"))
    }

    /// Load the session from `path`. A missing file yields a signed-out session.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_kdl(&read_kdl(path)?))
    }

    /// Write the session to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_kdl(path, &self.to_kdl())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(STATE_FILE_MODE))?;
        }
        Ok(())
    }

    /// Remove the persisted session, if any.
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Check that a base URL is an absolute http(s) URL.
pub fn validate_base_url(url: &str) -> std::result::Result<(), String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(format!(
            "api-base-url must start with http:// or https://, got {}",
            url
        ))
    }
}

fn read_kdl(path: &Path) -> Result<KdlDocument> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text.parse::<KdlDocument>()?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(KdlDocument::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_kdl(path: &Path, doc: &KdlDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    Ok(())
}

fn string_entry(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}

fn u64_entry(doc: &KdlDocument, name: &str) -> Option<u64> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_integer())
        .and_then(|i| u64::try_from(i).ok())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

fn push_integer(doc: &mut KdlDocument, name: &str, value: u64) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::Integer(value as i128)));
    doc.nodes_mut().push(node);
}
