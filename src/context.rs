//! The client context: one explicitly constructed owner for all shared state.
//!
//! A [`ClientContext`] owns the availability verdict, the local store, the
//! session and the transport. Every resource client is a cheap handle into it.
//!
//! ```no_run
//! # async fn demo() -> lifeplan::Result<()> {
//! use lifeplan::{ClientContext, ListFilter, SessionState, Vision};
//!
//! let ctx = ClientContext::builder()
//!     .session(SessionState::signed_in("1717171717171"))
//!     .build()?;
//! let vision = ctx.visions().create(Vision::new("Financial freedom")).await?;
//! let all = ctx.visions().get_all(ListFilter::none()).await?;
//! # let _ = (vision, all);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::availability::{AvailabilityProber, Verdict};
use crate::client::{ClientParts, PageStateClient, ResourceClient};
use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, ClientSettings, SessionState, resolve_config};
use crate::executor::ResilientExecutor;
use crate::models::{
    Affirmation, DailyWord, Goal, HealthRecord, ListFilter, Person, Task, Todo, Vision,
    VisionDraft,
};
use crate::orchestrator::{self, SubmissionReport};
use crate::remote::RemoteApi;
use crate::storage::LocalStore;
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};

/// Shared state behind every client.
pub struct ClientContext {
    settings: ClientSettings,
    session: Arc<RwLock<SessionState>>,
    prober: Arc<AvailabilityProber>,
    parts: ClientParts,
}

impl ClientContext {
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::default()
    }

    /// Context from the system config.kdl, `LIFEPLAN_API_URL` and state.kdl.
    pub fn from_system_config() -> Result<Self> {
        let file = match ClientConfig::system_path() {
            Some(path) => ClientConfig::load(&path)?,
            None => ClientConfig::default(),
        };
        let resolved = resolve_config(&file, &ClientConfig::default())?;
        let session = match SessionState::system_path() {
            Some(path) => SessionState::load(&path)?,
            None => SessionState::new(),
        };
        info!(
            api_base_url = %resolved.api_base_url.value,
            source = %resolved.api_base_url.source,
            "client configured"
        );
        Self::builder()
            .settings(resolved.settings())
            .session(session)
            .build()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.parts.clock
    }

    // === Session ===

    /// Snapshot of the current session.
    pub fn session(&self) -> SessionState {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the session; subsequent requests carry the new identity.
    pub fn set_session(&self, session: SessionState) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    pub fn sign_out(&self) {
        self.set_session(SessionState::new());
    }

    pub fn current_user(&self) -> Option<String> {
        self.parts.remote.current_user()
    }

    // === Availability ===

    /// Cached availability of the backend.
    pub async fn is_available(&self) -> bool {
        self.prober.is_available().await
    }

    /// Probe the backend now, ignoring any cached verdict.
    pub async fn test_connection(&self) -> bool {
        let Verdict { available, .. } = self.prober.refresh().await;
        if available {
            info!("backend connection ok");
        } else {
            warn!(url = %self.settings.api_base_url, "backend unreachable");
        }
        available
    }

    pub fn prober(&self) -> &Arc<AvailabilityProber> {
        &self.prober
    }

    // === Clients ===

    pub fn visions(&self) -> ResourceClient<Vision> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn goals(&self) -> ResourceClient<Goal> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn tasks(&self) -> ResourceClient<Task> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn todos(&self) -> ResourceClient<Todo> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn people(&self) -> ResourceClient<Person> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn affirmations(&self) -> ResourceClient<Affirmation> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn health(&self) -> ResourceClient<HealthRecord> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn daily_words(&self) -> ResourceClient<DailyWord> {
        ResourceClient::new(self.parts.clone())
    }

    pub fn page_state(&self) -> PageStateClient {
        PageStateClient::new(self.parts.clone())
    }

    // === Composite operations ===

    /// Create a vision and everything nested under it.
    pub async fn submit_vision(&self, draft: VisionDraft) -> Result<SubmissionReport> {
        orchestrator::submit_vision(self, draft).await
    }

    /// Every list at once. A list that cannot be fetched comes back empty.
    pub async fn snapshot(&self, filter: ListFilter) -> PlannerSnapshot {
        let clients = (
            self.visions(),
            self.goals(),
            self.tasks(),
            self.todos(),
            self.people(),
            self.affirmations(),
            self.health(),
            self.daily_words(),
        );
        let (visions, goals, tasks, todos, people, affirmations, health, words) = tokio::join!(
            clients.0.get_all(filter),
            clients.1.get_all(filter),
            clients.2.get_all(filter),
            clients.3.get_all(filter),
            clients.4.get_all(filter),
            clients.5.get_all(filter),
            clients.6.get_all(filter),
            clients.7.get_all(filter),
        );
        PlannerSnapshot {
            visions: settled("visions", visions),
            goals: settled("goals", goals),
            tasks: settled("tasks", tasks),
            todos: settled("todos", todos),
            people: settled("people", people),
            affirmations: settled("affirmations", affirmations),
            health: settled("health", health),
            daily_words: settled("daily-words", words),
        }
    }

    // === Local store ===

    pub fn store(&self) -> &Arc<Mutex<LocalStore>> {
        &self.parts.store
    }

    /// Write the local store to `dir` as JSONL.
    pub async fn save_local(&self, dir: &Path) -> Result<()> {
        self.parts.store.lock().await.save_to_dir(dir)
    }

    /// Replace the local store with the one saved in `dir`.
    pub async fn load_local(&self, dir: &Path) -> Result<()> {
        let loaded = LocalStore::load_from_dir(dir)?;
        *self.parts.store.lock().await = loaded;
        Ok(())
    }
}

fn settled<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(resource = what, error = %e, "could not load list");
        Vec::new()
    })
}

/// All planner lists, as loaded by [`ClientContext::snapshot`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerSnapshot {
    pub visions: Vec<Vision>,
    pub goals: Vec<Goal>,
    pub tasks: Vec<Task>,
    pub todos: Vec<Todo>,
    pub people: Vec<Person>,
    pub affirmations: Vec<Affirmation>,
    pub health: Vec<HealthRecord>,
    pub daily_words: Vec<DailyWord>,
}

impl PlannerSnapshot {
    /// Total number of records across all lists.
    pub fn len(&self) -> usize {
        self.visions.len()
            + self.goals.len()
            + self.tasks.len()
            + self.todos.len()
            + self.people.len()
            + self.affirmations.len()
            + self.health.len()
            + self.daily_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for [`ClientContext`].
///
/// Unset parts default to the built-in settings, an `HttpTransport` for the
/// configured base URL, the system clock, a signed-out session and an empty
/// local store.
#[derive(Default)]
pub struct ClientContextBuilder {
    settings: Option<ClientSettings>,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    session: Option<SessionState>,
    store: Option<LocalStore>,
}

impl ClientContextBuilder {
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn session(mut self, session: SessionState) -> Self {
        self.session = Some(session);
        self
    }

    pub fn store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<ClientContext> {
        let settings = self.settings.unwrap_or_default();
        if settings.request_timeout.is_zero() || settings.probe_timeout.is_zero() {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                settings.api_base_url.clone(),
                settings.request_timeout,
            )?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let session = Arc::new(RwLock::new(self.session.unwrap_or_default()));

        let remote = RemoteApi::new(transport, session.clone(), settings.request_timeout);
        let prober = Arc::new(AvailabilityProber::new(
            remote.clone(),
            clock.clone(),
            settings.health_path.clone(),
            settings.probe_timeout,
            settings.freshness_window,
        ));
        let parts = ClientParts {
            remote,
            executor: ResilientExecutor::new(prober.clone()),
            store: Arc::new(Mutex::new(self.store.unwrap_or_default())),
            clock,
        };

        Ok(ClientContext {
            settings,
            session,
            prober,
            parts,
        })
    }
}
