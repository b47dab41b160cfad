//! Common test utilities for lifeplan integration tests.
//!
//! Provides `FakeBackend`, an in-memory `Transport` that behaves like the REST
//! service closely enough for end-to-end tests: it assigns ids, partitions
//! records by `userId`, answers 404 for unknown ids and records every request.
//! It can be switched offline, made to hang, or told to fail selected requests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lifeplan::{
    ApiRequest, ApiResponse, ClientContext, Error, ManualClock, Method, Result, SessionState,
    Transport,
};

pub use tempfile::TempDir;

/// User every test context signs in as, unless stated otherwise.
pub const TEST_USER: &str = "user-1";

type FailRule = Box<dyn Fn(&ApiRequest) -> bool + Send + Sync>;

/// In-memory stand-in for the REST backend.
#[derive(Default)]
pub struct FakeBackend {
    offline: AtomicBool,
    hang: AtomicBool,
    envelope: AtomicBool,
    next_id: AtomicU64,
    collections: Mutex<BTreeMap<String, Vec<Value>>>,
    pages: Mutex<BTreeMap<String, Value>>,
    requests: Mutex<Vec<ApiRequest>>,
    fail_rules: Mutex<Vec<FailRule>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend that refuses every connection.
    pub fn offline() -> Arc<Self> {
        let backend = Self::new();
        backend.set_offline(true);
        backend
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Never answer any request.
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Wrap successful responses in `{ success, data }`.
    pub fn set_envelope(&self, envelope: bool) {
        self.envelope.store(envelope, Ordering::SeqCst);
    }

    /// Answer 500 to every request matching `rule`.
    pub fn fail_when(&self, rule: impl Fn(&ApiRequest) -> bool + Send + Sync + 'static) {
        self.fail_rules.lock().unwrap().push(Box::new(rule));
    }

    /// Answer 500 to creates on `path` whose body has `field == value`.
    pub fn fail_create(&self, path: &'static str, field: &'static str, value: &'static str) {
        self.fail_when(move |req| {
            req.method == Method::Post
                && req.path == path
                && req.body.as_ref().and_then(|b| b.get(field)).and_then(Value::as_str)
                    == Some(value)
        });
    }

    // === Inspection ===

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than reachability probes.
    pub fn data_requests(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !is_probe(r))
            .collect()
    }

    pub fn probe_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| is_probe(r))
            .count()
    }

    /// POST bodies sent to `path`, in order.
    pub fn created_bodies(&self, path: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Post && r.path == path)
            .filter_map(|r| r.body)
            .collect()
    }

    /// Stored records for a collection path such as `/goals`.
    pub fn records(&self, path: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(path.trim_start_matches('/'))
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a record directly, bypassing requests.
    pub fn seed(&self, path: &str, mut record: Value) -> String {
        let id = self.assign_id();
        record["id"] = Value::String(id.clone());
        self.collections
            .lock()
            .unwrap()
            .entry(path.trim_start_matches('/').to_string())
            .or_default()
            .push(record);
        id
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn assign_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    // === Routing ===

    fn route(&self, req: &ApiRequest) -> ApiResponse {
        if is_probe(req) {
            return ApiResponse::ok(json!({"ok": true}));
        }

        let user = match req.method {
            Method::Get | Method::Delete => req.query_param("userId").map(str::to_string),
            Method::Post | Method::Put => req
                .body
                .as_ref()
                .and_then(|b| b.get("userId"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let Some(user) = user else {
            return ApiResponse::new(400, json!({"error": "userId is required"}));
        };

        if req.path == "/page-state" {
            return self.route_page_state(req, &user);
        }

        let mut segments = req.path.trim_start_matches('/').splitn(2, '/');
        let collection = segments.next().unwrap_or_default().to_string();
        let id = segments.next().map(str::to_string);
        let mut collections = self.collections.lock().unwrap();
        let records = collections.entry(collection).or_default();
        let owned = |r: &Value| r.get("userId").and_then(Value::as_str) == Some(user.as_str());

        match (req.method, id) {
            (Method::Get, None) => {
                let year = req.query_param("year");
                let date = req.query_param("date");
                let found: Vec<Value> = records
                    .iter()
                    .filter(|r| owned(*r))
                    .filter(|r| year.is_none_or(|y| field_text(r, "year").as_deref() == Some(y)))
                    .filter(|r| date.is_none_or(|d| field_text(r, "date").as_deref() == Some(d)))
                    .cloned()
                    .collect();
                ApiResponse::ok(Value::Array(found))
            }
            (Method::Post, None) => {
                let mut record = req.body.clone().unwrap_or(Value::Object(Map::new()));
                record["id"] = json!(self.assign_id());
                records.push(record.clone());
                ApiResponse::new(201, record)
            }
            (Method::Put, Some(id)) => {
                let Some(existing) = records
                    .iter_mut()
                    .find(|r| has_id(r, &id) && owned(&**r))
                else {
                    return ApiResponse::new(404, json!({"error": "Record not found"}));
                };
                if let (Value::Object(target), Some(Value::Object(patch))) =
                    (&mut *existing, req.body.as_ref())
                {
                    for (k, v) in patch {
                        if k != "id" {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                }
                ApiResponse::ok(existing.clone())
            }
            (Method::Delete, Some(id)) => {
                let before = records.len();
                records.retain(|r| !(has_id(r, &id) && owned(r)));
                if records.len() == before {
                    ApiResponse::new(404, json!({"error": "Record not found"}))
                } else {
                    ApiResponse::ok(json!({"message": "Deleted"}))
                }
            }
            _ => ApiResponse::new(405, json!({"error": "Method not allowed"})),
        }
    }

    fn route_page_state(&self, req: &ApiRequest, user: &str) -> ApiResponse {
        let mut pages = self.pages.lock().unwrap();
        match req.method {
            Method::Get => ApiResponse::ok(pages.get(user).cloned().unwrap_or(Value::Null)),
            Method::Post | Method::Put => {
                let body = req.body.clone().unwrap_or(Value::Null);
                pages.insert(user.to_string(), body.clone());
                ApiResponse::ok(body)
            }
            Method::Delete => {
                pages.remove(user);
                ApiResponse::ok(json!({"message": "Deleted"}))
            }
        }
    }

    /// Page state stored for `user`.
    pub fn page_for(&self, user: &str) -> Option<Value> {
        self.pages.lock().unwrap().get(user).cloned()
    }

    /// Store page state for `user` directly.
    pub fn seed_page(&self, user: &str, page: Value) {
        self.pages.lock().unwrap().insert(user.to_string(), page);
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Http("connection refused".into()));
        }
        if self.fail_rules.lock().unwrap().iter().any(|rule| rule(&request)) {
            return Ok(ApiResponse::new(500, json!({"error": "forced failure"})));
        }

        let response = self.route(&request);
        if self.envelope.load(Ordering::SeqCst) && response.is_success() && !is_probe(&request) {
            return Ok(ApiResponse::new(
                response.status,
                json!({"success": true, "data": response.body}),
            ));
        }
        Ok(response)
    }
}

/// Field rendered the way it appears in a query string.
fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn has_id(record: &Value, id: &str) -> bool {
    record.get("id").and_then(Value::as_str) == Some(id)
}

/// Reachability probes are bare GETs of `/health`; list requests on the
/// health-records resource carry a `userId`.
pub fn is_probe(req: &ApiRequest) -> bool {
    req.method == Method::Get && req.path == "/health" && req.query_param("userId").is_none()
}

/// Fixed start time for deterministic clocks: 2026-03-15 12:00 UTC.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
    ))
}

/// Context over `backend`, signed in as `TEST_USER`.
pub fn context(backend: &Arc<FakeBackend>) -> ClientContext {
    context_with(backend, test_clock(), SessionState::signed_in(TEST_USER))
}

pub fn context_with(
    backend: &Arc<FakeBackend>,
    clock: Arc<ManualClock>,
    session: SessionState,
) -> ClientContext {
    ClientContext::builder()
        .transport(backend.clone())
        .clock(clock)
        .session(session)
        .build()
        .unwrap()
}
