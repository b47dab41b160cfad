//! Composite vision submission payload.
//!
//! A [`VisionDraft`] is what the vision-creation screen submits: a vision with
//! milestones embedded, each carrying goals, and each goal carrying tasks,
//! todos and an optional word commitment. Milestones are only a grouping
//! construct; they are consumed by the orchestrator and never persisted.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{DailyWord, Goal, Task, Todo, Vision};

/// Vision with its nested hierarchy, as submitted by the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionDraft {
    #[serde(flatten)]
    pub vision: Vision,

    #[serde(default)]
    pub milestones: Vec<MilestoneDraft>,
}

impl VisionDraft {
    /// Draft with no milestones.
    pub fn new(vision: Vision) -> Self {
        Self {
            vision,
            milestones: Vec::new(),
        }
    }

    /// Append a milestone.
    pub fn with_milestone(mut self, milestone: MilestoneDraft) -> Self {
        self.milestones.push(milestone);
        self
    }

    /// Number of goals across all milestones.
    pub fn goal_count(&self) -> usize {
        self.milestones.iter().map(|m| m.goals.len()).sum()
    }
}

/// Transient grouping of goals inside a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    #[serde(default)]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "super::lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "super::lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,

    #[serde(
        default,
        deserialize_with = "super::lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default)]
    pub goals: Vec<GoalDraft>,
}

impl MilestoneDraft {
    /// Named milestone with no goals.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a goal.
    pub fn with_goal(mut self, goal: GoalDraft) -> Self {
        self.goals.push(goal);
        self
    }
}

/// Goal with the templates created beneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDraft {
    #[serde(flatten)]
    pub goal: Goal,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub todos: Vec<Todo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_word: Option<WordCommitment>,
}

impl GoalDraft {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            ..Default::default()
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.todos.push(todo);
        self
    }

    pub fn with_word(mut self, word: WordCommitment) -> Self {
        self.my_word = Some(word);
        self
    }

    /// The word commitment, if one was actually filled in.
    pub fn word(&self) -> Option<&WordCommitment> {
        self.my_word.as_ref().filter(|w| !w.is_empty())
    }
}

/// "My word" commitment attached to a goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCommitment {
    #[serde(default)]
    pub text: String,

    #[serde(
        default,
        deserialize_with = "super::lenient::opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time: Option<NaiveDateTime>,

    #[serde(default)]
    pub completed: bool,
}

impl WordCommitment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Blank commitments are skipped.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Dated record for this commitment; undated ones land on `submitted_on`.
    pub fn to_daily_word(&self, submitted_on: NaiveDate) -> DailyWord {
        DailyWord {
            id: None,
            user_id: None,
            word: self.text.trim().to_string(),
            date: Some(self.date_time.map(|t| t.date()).unwrap_or(submitted_on)),
            target_at: self.date_time,
            completed: self.completed,
        }
    }
}
