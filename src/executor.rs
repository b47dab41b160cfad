//! Remote-first execution with transparent local fallback.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;
use crate::availability::AvailabilityProber;

/// Runs an operation remotely when the service is up, locally otherwise.
#[derive(Clone)]
pub struct ResilientExecutor {
    prober: Arc<AvailabilityProber>,
}

impl ResilientExecutor {
    pub fn new(prober: Arc<AvailabilityProber>) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &Arc<AvailabilityProber> {
        &self.prober
    }

    /// Execute `remote` if the backend is judged available, else `local`.
    ///
    /// A remote failure (see [`crate::Error::is_remote_failure`]) is logged and answered
    /// by `local`. Any other error from the remote branch is returned as is.
    /// Neither future is polled unless chosen.
    pub async fn execute<T, R, L>(&self, op: &str, remote: R, local: L) -> Result<T>
    where
        R: Future<Output = Result<T>>,
        L: Future<Output = Result<T>>,
    {
        if self.prober.is_available().await {
            match remote.await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_remote_failure() => {
                    warn!(op, error = %e, "remote call failed, using local store");
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!(op, "service unavailable, using local store");
        }
        local.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use crate::clock::ManualClock;
    use crate::config::SessionState;
    use crate::remote::RemoteApi;
    use crate::transport::{ApiRequest, ApiResponse, Transport};
    use crate::Error;

    struct Switch(AtomicBool);

    #[async_trait]
    impl Transport for Switch {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse> {
            if self.0.load(Ordering::SeqCst) {
                Ok(ApiResponse::ok(json!({"ok": true})))
            } else {
                Err(Error::Http("connection refused".into()))
            }
        }
    }

    fn executor(up: bool) -> ResilientExecutor {
        let remote = RemoteApi::new(
            Arc::new(Switch(AtomicBool::new(up))),
            Arc::new(RwLock::new(SessionState::new())),
            Duration::from_secs(1),
        );
        let prober = AvailabilityProber::new(
            remote,
            Arc::new(ManualClock::default()),
            "/health",
            Duration::from_secs(1),
            Duration::from_secs(10),
        );
        ResilientExecutor::new(Arc::new(prober))
    }

    #[tokio::test]
    async fn test_remote_result_wins_when_available() {
        let exec = executor(true);
        let value = exec
            .execute("op", async { Ok("remote") }, async { Ok("local") })
            .await
            .unwrap();
        assert_eq!(value, "remote");
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let exec = executor(true);
        let value = exec
            .execute(
                "op",
                async { Err(Error::Timeout(Duration::from_secs(1))) },
                async { Ok("local") },
            )
            .await
            .unwrap();
        assert_eq!(value, "local");
    }

    #[tokio::test]
    async fn test_non_remote_error_is_not_masked() {
        let exec = executor(true);
        let local_ran = AtomicBool::new(false);
        let err = exec
            .execute::<(), _, _>(
                "op",
                async { Err(Error::InvalidInput("bad".into())) },
                async {
                    local_ran.store(true, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!local_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unavailable_skips_remote() {
        let exec = executor(false);
        let remote_ran = AtomicBool::new(false);
        let value = exec
            .execute(
                "op",
                async {
                    remote_ran.store(true, Ordering::SeqCst);
                    Ok(1)
                },
                async { Ok(2) },
            )
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert!(!remote_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_local_error_surfaces() {
        let exec = executor(false);
        let err = exec
            .execute::<(), _, _>(
                "op",
                async { Ok(()) },
                async { Err(Error::NotFound("goals/9".into())) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
