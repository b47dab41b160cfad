//! Cached reachability verdict for the remote service.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::remote::RemoteApi;

/// Outcome of one reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

impl Verdict {
    /// Whether this verdict is still usable at `now`.
    ///
    /// A verdict from the future (clock moved backwards) is treated as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.checked_at).to_std() {
            Ok(age) => age < window,
            Err(_) => false,
        }
    }
}

/// Answers "is the backend up?" with at most one probe per freshness window.
///
/// The cache lock is held across the probe, so concurrent callers that find a
/// stale verdict wait for the single in-flight probe instead of issuing their own.
pub struct AvailabilityProber {
    remote: RemoteApi,
    clock: Arc<dyn Clock>,
    health_path: String,
    probe_timeout: Duration,
    freshness_window: Duration,
    verdict: Mutex<Option<Verdict>>,
}

impl AvailabilityProber {
    pub fn new(
        remote: RemoteApi,
        clock: Arc<dyn Clock>,
        health_path: impl Into<String>,
        probe_timeout: Duration,
        freshness_window: Duration,
    ) -> Self {
        Self {
            remote,
            clock,
            health_path: health_path.into(),
            probe_timeout,
            freshness_window,
            verdict: Mutex::new(None),
        }
    }

    /// Cached verdict if fresh, otherwise a new probe. Never fails.
    pub async fn is_available(&self) -> bool {
        let mut cached = self.verdict.lock().await;
        if let Some(verdict) = *cached {
            if verdict.is_fresh(self.clock.now(), self.freshness_window) {
                return verdict.available;
            }
        }
        let verdict = self.probe().await;
        *cached = Some(verdict);
        verdict.available
    }

    /// Probe now, regardless of the cached verdict, and cache the result.
    pub async fn refresh(&self) -> Verdict {
        let mut cached = self.verdict.lock().await;
        let verdict = self.probe().await;
        *cached = Some(verdict);
        verdict
    }

    /// Last verdict without probing.
    pub async fn last_verdict(&self) -> Option<Verdict> {
        *self.verdict.lock().await
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    async fn probe(&self) -> Verdict {
        let available = match self.remote.probe(&self.health_path, self.probe_timeout).await {
            Ok(up) => up,
            Err(e) => {
                debug!(error = %e, "availability probe failed");
                false
            }
        };
        let verdict = Verdict {
            available,
            checked_at: self.clock.now(),
        };
        debug!(available, path = %self.health_path, "availability verdict");
        verdict
    }
}
