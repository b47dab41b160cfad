//! Remote branch of every resource operation.
//!
//! `RemoteApi` sits between the resource clients and a [`Transport`]. It:
//! - attaches the signed-in user's identity to every request
//! - bounds every call with the configured timeout
//! - maps non-success statuses to errors
//! - unwraps the backend's optional `{ success, data, message }` envelope

use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SessionState;
use crate::models::{Entity, ListFilter, Patch, ResourceKind};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::{Error, Result};

/// Header carrying the current user's identity.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Field / query parameter carrying the current user's identity.
pub const USER_ID_FIELD: &str = "userId";

/// Identity-propagating, timeout-bounded access to the REST backend.
#[derive(Clone)]
pub struct RemoteApi {
    transport: Arc<dyn Transport>,
    session: Arc<RwLock<SessionState>>,
    timeout: Duration,
}

impl RemoteApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<RwLock<SessionState>>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            timeout,
        }
    }

    /// Identity of the signed-in user, if any.
    pub fn current_user(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .user_id()
            .map(str::to_string)
    }

    /// Attach the current user to a request.
    ///
    /// Header always; query parameter for GET/DELETE; body field for
    /// POST/PUT object bodies. Requests go out untouched when signed out.
    pub fn with_identity(&self, mut request: ApiRequest) -> ApiRequest {
        let Some(user_id) = self.current_user() else {
            return request;
        };
        request = request.with_header(USER_ID_HEADER, user_id.clone());
        match request.method {
            Method::Get | Method::Delete => {
                request = request.with_query(USER_ID_FIELD, user_id);
            }
            Method::Post | Method::Put => {
                if let Some(Value::Object(ref mut map)) = request.body {
                    map.insert(USER_ID_FIELD.to_string(), Value::String(user_id));
                }
            }
        }
        request
    }

    /// Send a request with identity and timeout, rejecting non-success statuses.
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let response = self.send_raw(request, self.timeout).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }
        unwrap_envelope(response.body)
    }

    /// Send with identity and an explicit timeout; return the response as received.
    pub async fn send_raw(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse> {
        self.dispatch(self.with_identity(request), timeout).await
    }

    async fn dispatch(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse> {
        let request = request.with_timeout(timeout);
        let method = request.method;
        let path = request.path.clone();
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => {
                debug!(%method, %path, status = response.status, "remote response");
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(%method, %path, ?timeout, "remote call timed out");
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// GET the collection, optionally filtered.
    pub async fn list<T: Entity>(&self, filter: &ListFilter) -> Result<Vec<T>> {
        let mut request = ApiRequest::get(T::KIND.path());
        for (key, value) in filter.for_kind(T::KIND).to_query() {
            request = request.with_query(key, value);
        }
        let body = self.send(request).await?;
        match body {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => Ok(serde_json::from_value(body)?),
            other => Err(Error::Status {
                status: 200,
                message: format!("expected a list of {}, got {}", T::KIND, kind_of(&other)),
            }),
        }
    }

    /// POST a new record; the returned record carries the server's identity.
    pub async fn create<T: Entity>(&self, entity: &T) -> Result<T> {
        let body = serde_json::to_value(entity)?;
        let created: T = serde_json::from_value(
            self.send(ApiRequest::post(T::KIND.path(), body)).await?,
        )?;
        if created.id().is_none() {
            return Err(Error::Status {
                status: 200,
                message: format!("created {} record has no id", T::KIND),
            });
        }
        Ok(created)
    }

    /// PUT a patch onto an existing record.
    pub async fn update<T: Entity>(&self, id: &str, patch: &Patch) -> Result<T> {
        let body = Value::Object(patch.clone());
        let updated = self
            .send(ApiRequest::put(T::KIND.item_path(id), body))
            .await?;
        Ok(serde_json::from_value(updated)?)
    }

    /// DELETE a record.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.send(ApiRequest::delete(kind.item_path(id))).await?;
        Ok(())
    }

    /// Reachability check against `path`.
    ///
    /// Sent without identity, so it cannot be mistaken for a list request on
    /// the health-records resource. A success status whose body does not carry
    /// `"ok": false` counts as up.
    pub async fn probe(&self, path: &str, timeout: Duration) -> Result<bool> {
        let response = self.dispatch(ApiRequest::get(path), timeout).await?;
        if !response.is_success() {
            return Ok(false);
        }
        Ok(response.body.get("ok").and_then(Value::as_bool) != Some(false))
    }
}

/// Strip a `{ success, data }` envelope, or pass the body through.
pub fn unwrap_envelope(body: Value) -> Result<Value> {
    match body {
        Value::Object(mut map) if map.contains_key("success") => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(Error::Status {
                    status: 200,
                    message: error_message(&Value::Object(map)),
                });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn status_error(response: &ApiResponse) -> Error {
    Error::Status {
        status: response.status,
        message: error_message(&response.body),
    }
}

fn error_message(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
