//! Lifeplan - an offline-tolerant data-access client for a life-planning service.
//!
//! This library is the layer every planner screen talks to. It provides:
//! - per-resource clients (visions, goals, tasks, todos, people, affirmations,
//!   health records and daily words) that transparently fall back to a local
//!   in-memory store when the REST backend is unreachable
//! - a cached availability probe so repeated calls do not hammer a dead service
//! - hierarchical submission of a vision with embedded milestones, goals, tasks,
//!   todos and word commitments, with per-node outcome reporting
//!
//! Everything hangs off an explicitly constructed [`ClientContext`].

pub mod availability;
pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod executor;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod remote;
pub mod storage;
pub mod transport;

pub use availability::{AvailabilityProber, Verdict};
pub use client::{PageStateClient, ResourceClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, SessionState};
pub use context::{ClientContext, ClientContextBuilder, PlannerSnapshot};
pub use executor::ResilientExecutor;
pub use models::{
    Affirmation, DailyWord, Entity, Goal, HealthRecord, ListFilter, Patch, Person,
    ResourceKind, Task, Todo, Vision,
};
pub use orchestrator::{NodeKind, NodeOutcome, NodePath, NodeStatus, SubmissionReport};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

use std::time::Duration;

/// Library-level error type for planner operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the remote service could not serve the call.
    ///
    /// These are the failures the executor recovers from by falling back to
    /// the local store.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Status { .. } | Error::Timeout(_) | Error::Json(_)
        )
    }

    /// Generic message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Status { message, .. } if !message.is_empty() => message.clone(),
            Error::Status { .. } => "Server error".to_string(),
            Error::Http(_) | Error::Timeout(_) => {
                "No response from server. Please check your internet connection.".to_string()
            }
            Error::NotFound(_) => "The requested item could not be found.".to_string(),
            other => {
                let text = other.to_string();
                if text.is_empty() {
                    "An unknown error occurred".to_string()
                } else {
                    text
                }
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<kdl::KdlError> for Error {
    fn from(err: kdl::KdlError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, Error>;
