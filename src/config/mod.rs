//! Configuration and session state for the planner client.
//!
//! This module defines KDL schemas for two distinct files:
//!
//! ## config.kdl - Client preferences
//!
//! Located at `~/.config/lifeplan/config.kdl`. Contains the REST base URL,
//! request and probe timeouts, the availability freshness window and the
//! reachability endpoint path.
//!
//! ## state.kdl - Session state
//!
//! Located at `~/.local/share/lifeplan/state.kdl`. Contains the signed-in
//! user's identity, which is attached to every outgoing remote request.
//! Written with 0600 permissions.
//!
//! ## Precedence
//!
//! explicit override > `LIFEPLAN_API_URL` > config.kdl > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{API_URL_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config};
pub use schema::{ClientConfig, ClientSettings, SessionState};
#[cfg(unix)]
pub use schema::STATE_FILE_MODE;
