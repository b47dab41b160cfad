//! Data models for planner entities.
//!
//! This module defines the per-resource data-transfer types:
//! - `Vision` - Long-term aspiration, parent of goals
//! - `Goal` - Concrete objective under a vision
//! - `Task` / `Todo` - Work items under a goal
//! - `DailyWord` - Dated "my word" commitment
//! - `Person`, `Affirmation`, `HealthRecord` - Standalone personal records
//!
//! Every type implements [`Entity`], which ties it to its REST resource and
//! validates it at the boundary before anything is dispatched. The wire format
//! is the backend's camelCase JSON.

pub mod submission;

pub use submission::{GoalDraft, MilestoneDraft, VisionDraft, WordCommitment};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::{Error, Result};

/// Partial update: top-level fields to overwrite on an existing record.
pub type Patch = Map<String, Value>;

/// Build a [`Patch`] from any serializable value (usually a `json!` object).
pub fn patch_of<T: Serialize>(value: &T) -> Result<Patch> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "patch must be a JSON object, got {}",
            other
        ))),
    }
}

/// REST resources exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Vision,
    Goal,
    Task,
    Todo,
    Person,
    Affirmation,
    Health,
    DailyWord,
}

impl ResourceKind {
    /// All resource kinds, in dependency order.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Vision,
        ResourceKind::Goal,
        ResourceKind::Task,
        ResourceKind::Todo,
        ResourceKind::Person,
        ResourceKind::Affirmation,
        ResourceKind::Health,
        ResourceKind::DailyWord,
    ];

    /// Collection name, as used in URLs and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "visions",
            Self::Goal => "goals",
            Self::Task => "tasks",
            Self::Todo => "todos",
            Self::Person => "people",
            Self::Affirmation => "affirmations",
            Self::Health => "health",
            Self::DailyWord => "daily-words",
        }
    }

    /// Collection endpoint relative to the base URL.
    pub fn path(&self) -> String {
        format!("/{}", self.as_str())
    }

    /// Endpoint for a single record.
    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.as_str(), id)
    }

    /// Prefix for identifiers generated by the local store.
    pub fn local_prefix(&self) -> &'static str {
        match self {
            Self::Vision => "local-vision",
            Self::Goal => "local-goal",
            Self::Task => "local-task",
            Self::Todo => "local-todo",
            Self::Person => "local-person",
            Self::Affirmation => "local-affirmation",
            Self::Health => "local-health",
            Self::DailyWord => "local-word",
        }
    }

    /// Parse a collection name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Wire field holding the record's calendar date, if the resource is dated.
    ///
    /// People and affirmations are undated, so list filters do not apply to them.
    pub fn date_field(&self) -> Option<&'static str> {
        match self {
            Self::Vision | Self::Goal => Some("startDate"),
            Self::Task | Self::Health | Self::DailyWord => Some("date"),
            Self::Todo => Some("dueDate"),
            Self::Person | Self::Affirmation => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional list filter, sent as query parameters and applied locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub year: Option<i32>,
    pub date: Option<NaiveDate>,
}

impl ListFilter {
    /// No filtering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only records stamped with `year`.
    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            date: None,
        }
    }

    /// Only records dated `date`.
    pub fn date(date: NaiveDate) -> Self {
        Self {
            year: None,
            date: Some(date),
        }
    }

    /// The filter as it applies to `kind`: undated resources are never filtered.
    pub fn for_kind(&self, kind: ResourceKind) -> Self {
        match kind.date_field() {
            Some(_) => *self,
            None => Self::none(),
        }
    }

    /// Query parameters for the remote call.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(year) = self.year {
            query.push(("year".to_string(), year.to_string()));
        }
        if let Some(date) = self.date {
            query.push(("date".to_string(), date.to_string()));
        }
        query
    }

    /// Whether a stored record of `kind` passes this filter.
    ///
    /// `year` matches the stamped `year` field, or the year of the record's
    /// date when nothing is stamped. `date` matches the kind's date field.
    pub fn matches(&self, kind: ResourceKind, record: &Value) -> bool {
        let Some(field) = kind.date_field() else {
            return true;
        };
        let dated = record
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok());

        if let Some(year) = self.year {
            let stamped = record.get("year").and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            });
            let effective = stamped.or_else(|| dated.map(|d| i64::from(d.year())));
            if effective != Some(i64::from(year)) {
                return false;
            }
        }
        if let Some(date) = self.date {
            if dated != Some(date) {
                return false;
            }
        }
        true
    }
}

/// A record type backed by one REST resource.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// The resource this entity lives in.
    const KIND: ResourceKind;

    /// Identity, once assigned by the server or the local store.
    fn id(&self) -> Option<&str>;

    /// Assign identity.
    fn set_id(&mut self, id: String);

    /// Boundary validation run before any dispatch.
    fn validate(&self) -> Result<()>;

    /// Fill in derived fields before dispatch.
    fn prepare(&mut self, _today: NaiveDate) {}
}

macro_rules! entity_identity {
    ($kind:expr) => {
        const KIND: ResourceKind = $kind;

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    };
}

/// Priority shared by visions, goals, tasks and todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Goal progress status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Paused,
    #[serde(other)]
    Other,
}

/// Top-level long-term aspiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vision {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Owner, stamped by the remote layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(alias = "visionStatement")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, alias = "visualImageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Planning year, used by the `year` list filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default)]
    pub priority: Priority,
}

impl Vision {
    /// Create a vision with just a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Entity for Vision {
    entity_identity!(ResourceKind::Vision);

    fn validate(&self) -> Result<()> {
        require_text("vision title", &self.title)?;
        check_range("vision", self.start_date, self.end_date)?;
        check_budget("vision", self.budget)
    }

    fn prepare(&mut self, today: NaiveDate) {
        if self.year.is_none() {
            self.year = Some(self.start_date.unwrap_or(today).year());
        }
    }
}

/// Concrete objective under a vision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Owning vision
    #[serde(
        default,
        alias = "linkedVisionId",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vision_id: Option<String>,

    #[serde(alias = "goalTitle")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,

    /// Time of day, `HH:MM`
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,

    /// Time of day, `HH:MM`
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<f64>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: GoalStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Goal {
    /// Create a goal with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Goal {
    entity_identity!(ResourceKind::Goal);

    fn validate(&self) -> Result<()> {
        require_text("goal name", &self.name)?;
        check_range("goal", self.start_date, self.end_date)?;
        check_time("goal start time", self.start_time.as_deref())?;
        check_time("goal end time", self.end_time.as_deref())?;
        check_budget("goal", self.budget)
    }

    fn prepare(&mut self, today: NaiveDate) {
        if self.year.is_none() {
            self.year = Some(self.start_date.unwrap_or(today).year());
        }
    }
}

/// Scheduled work item under a goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub goal_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vision_id: Option<String>,

    pub name: String,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,

    /// Time of day, `HH:MM`
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<f64>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub completed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Task {
    /// Create a task with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Task {
    entity_identity!(ResourceKind::Task);

    fn validate(&self) -> Result<()> {
        require_text("task name", &self.name)?;
        check_time("task time", self.time.as_deref())?;
        check_budget("task", self.budget)
    }

    fn prepare(&mut self, today: NaiveDate) {
        if self.year.is_none() {
            self.year = Some(self.date.unwrap_or(today).year());
        }
    }
}

/// Unscheduled checklist item under a goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub goal_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vision_id: Option<String>,

    #[serde(alias = "todoText")]
    pub text: String,

    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub completed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Todo {
    /// Create a todo with just its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

impl Entity for Todo {
    entity_identity!(ResourceKind::Todo);

    fn validate(&self) -> Result<()> {
        require_text("todo text", &self.text)
    }

    fn prepare(&mut self, today: NaiveDate) {
        if self.year.is_none() {
            self.year = Some(self.due_date.unwrap_or(today).year());
        }
    }
}

/// Dated "my word" commitment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWord {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(alias = "wordText")]
    pub word: String,

    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,

    /// When the commitment is due
    #[serde(
        default,
        deserialize_with = "lenient::opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub completed: bool,
}

impl DailyWord {
    /// Create a word record for `date`.
    pub fn new(word: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            word: word.into(),
            date: Some(date),
            ..Default::default()
        }
    }
}

impl Entity for DailyWord {
    entity_identity!(ResourceKind::DailyWord);

    fn validate(&self) -> Result<()> {
        require_text("word", &self.word)
    }

    fn prepare(&mut self, today: NaiveDate) {
        if self.date.is_none() {
            self.date = Some(self.target_at.map(|t| t.date()).unwrap_or(today));
        }
    }
}

/// Someone in the user's "diamond people" circle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Entity for Person {
    entity_identity!(ResourceKind::Person);

    fn validate(&self) -> Result<()> {
        require_text("person name", &self.name)?;
        if let Some(ref email) = self.email {
            if !email.is_empty() && !email.contains('@') {
                return Err(Error::InvalidInput(format!("invalid email: {}", email)));
            }
        }
        Ok(())
    }
}

/// Positive statement the user recites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affirmation {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub active: bool,
}

impl Entity for Affirmation {
    entity_identity!(ResourceKind::Affirmation);

    fn validate(&self) -> Result<()> {
        require_text("affirmation text", &self.text)
    }
}

/// One day of health tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,

    /// Self-reported energy, 0-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<u8>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sleep_hours: Option<f64>,

    /// Glasses of water
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<u32>,

    /// Minutes of exercise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_quality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for HealthRecord {
    entity_identity!(ResourceKind::Health);

    fn validate(&self) -> Result<()> {
        if self.date.is_none() {
            return Err(Error::InvalidInput("health record requires a date".into()));
        }
        if let Some(energy) = self.energy {
            if energy > 10 {
                return Err(Error::InvalidInput(format!(
                    "energy must be 0-10, got {}",
                    energy
                )));
            }
        }
        if let Some(hours) = self.sleep_hours {
            if !(0.0..=24.0).contains(&hours) {
                return Err(Error::InvalidInput(format!(
                    "sleep hours must be 0-24, got {}",
                    hours
                )));
            }
        }
        Ok(())
    }
}

fn require_text(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", what)));
    }
    Ok(())
}

fn check_range(what: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::InvalidInput(format!(
                "{} ends ({}) before it starts ({})",
                what, end, start
            )));
        }
    }
    Ok(())
}

fn check_time(what: &str, value: Option<&str>) -> Result<()> {
    if let Some(t) = value {
        if NaiveTime::parse_from_str(t, "%H:%M").is_err()
            && NaiveTime::parse_from_str(t, "%H:%M:%S").is_err()
        {
            return Err(Error::InvalidInput(format!(
                "{} must be HH:MM, got {}",
                what, t
            )));
        }
    }
    Ok(())
}

fn check_budget(what: &str, budget: Option<f64>) -> Result<()> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err(Error::InvalidInput(format!(
            "{} budget must be a non-negative number, got {}",
            what, b
        ))),
        _ => Ok(()),
    }
}

/// Deserializers that accept the loose shapes the backend and forms produce:
/// numeric or string ids, blank strings for absent dates and numbers.
mod lenient {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!("invalid id: {}", other))),
        }
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
    }

    pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => {
                // ISO timestamps ("2026-01-05T00:00:00.000Z") carry the date first
                let day = s.get(..10).unwrap_or(s.as_str());
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|e| D::Error::custom(format!("invalid date {:?}: {}", s, e)))
            }
        }
    }

    pub fn opt_datetime<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&s, fmt).ok())
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid datetime: {:?}", s))),
        }
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid number: {:?}", s))),
            Some(other) => Err(D::Error::custom(format!("invalid number: {}", other))),
        }
    }
}
