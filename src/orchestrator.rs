//! Hierarchical vision submission.
//!
//! Creates a vision, then walks its milestones depth-first creating each goal
//! under the new vision, and each goal's tasks, todos and word commitment under
//! the new goal. Every call is awaited before the next one starts, so a child
//! is never dispatched before its parent's id is known.
//!
//! Creation is best effort below the vision. A failed node is logged and
//! recorded in the [`SubmissionReport`]; its siblings and later milestones are
//! still attempted. Nothing already created is rolled back. Only a failure to
//! create the vision itself aborts the submission.

use std::fmt;
use tracing::{info, warn};

use crate::context::ClientContext;
use crate::models::{Entity, GoalDraft, Vision, VisionDraft};
use crate::{Error, Result};

/// Which node under a goal an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Goal,
    /// Task at this index within its goal
    Task(usize),
    /// Todo at this index within its goal
    Todo(usize),
    Word,
}

/// Position of a node in the submitted hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePath {
    pub milestone: usize,
    pub goal: usize,
    pub kind: NodeKind,
}

impl NodePath {
    fn goal(milestone: usize, goal: usize) -> Self {
        Self {
            milestone,
            goal,
            kind: NodeKind::Goal,
        }
    }

    fn child(&self, kind: NodeKind) -> Self {
        Self { kind, ..*self }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "milestones[{}].goals[{}]", self.milestone, self.goal)?;
        match self.kind {
            NodeKind::Goal => Ok(()),
            NodeKind::Task(i) => write!(f, ".tasks[{}]", i),
            NodeKind::Todo(i) => write!(f, ".todos[{}]", i),
            NodeKind::Word => write!(f, ".myWord"),
        }
    }
}

/// What happened to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Created { id: String },
    Failed { error: String },
    /// Not attempted because its goal could not be created
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    pub path: NodePath,
    pub status: NodeStatus,
}

/// Result of a submission: the created vision and every nested outcome, in
/// dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub vision: Vision,
    pub outcomes: Vec<NodeOutcome>,
}

impl SubmissionReport {
    /// Id of the created vision.
    pub fn vision_id(&self) -> &str {
        self.vision.id.as_deref().unwrap_or_default()
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == NodeStatus::Skipped)
    }

    /// Ids of created nodes matching `pred`, in creation order.
    pub fn created_ids(&self, pred: impl Fn(&NodeKind) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| pred(&o.path.kind))
            .filter_map(|o| match &o.status {
                NodeStatus::Created { id } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether every nested node was created.
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.status, NodeStatus::Created { .. }))
    }

    /// Outcome at `path`, if that node was part of the submission.
    pub fn outcome(&self, path: NodePath) -> Option<&NodeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.path == path)
            .map(|o| &o.status)
    }
}

/// Create `draft` and everything nested in it.
pub async fn submit_vision(ctx: &ClientContext, draft: VisionDraft) -> Result<SubmissionReport> {
    let VisionDraft { vision, milestones } = draft;
    let vision = ctx.visions().create(vision).await?;
    let vision_id = vision
        .id()
        .map(str::to_string)
        .ok_or_else(|| Error::Other("created vision has no id".into()))?;
    info!(vision_id = %vision_id, milestones = milestones.len(), "vision created");

    let mut outcomes = Vec::new();
    for (mi, milestone) in milestones.into_iter().enumerate() {
        for (gi, goal) in milestone.goals.into_iter().enumerate() {
            submit_goal(ctx, &vision_id, NodePath::goal(mi, gi), goal, &mut outcomes).await;
        }
    }

    let report = SubmissionReport { vision, outcomes };
    let failed = report.failures().count();
    if failed > 0 {
        warn!(vision_id = %vision_id, failed, "vision submitted with failures");
    }
    Ok(report)
}

async fn submit_goal(
    ctx: &ClientContext,
    vision_id: &str,
    path: NodePath,
    draft: GoalDraft,
    outcomes: &mut Vec<NodeOutcome>,
) {
    let word = draft.word().cloned();
    let GoalDraft {
        mut goal,
        tasks,
        todos,
        ..
    } = draft;
    goal.vision_id = Some(vision_id.to_string());

    let created = ctx.goals().create(goal).await.and_then(|g| {
        g.id()
            .map(str::to_string)
            .ok_or_else(|| Error::Other("created goal has no id".into()))
    });
    let goal_id = match created {
        Ok(id) => id,
        Err(e) => {
            record(outcomes, path, Err(e));
            skip_children(outcomes, path, tasks.len(), todos.len(), word.is_some());
            return;
        }
    };
    record(outcomes, path, Ok(goal_id.clone()));

    for (i, mut task) in tasks.into_iter().enumerate() {
        task.goal_id = Some(goal_id.clone());
        task.vision_id = Some(vision_id.to_string());
        let result = ctx.tasks().create(task).await.map(created_id);
        record(outcomes, path.child(NodeKind::Task(i)), result);
    }

    for (i, mut todo) in todos.into_iter().enumerate() {
        todo.goal_id = Some(goal_id.clone());
        todo.vision_id = Some(vision_id.to_string());
        let result = ctx.todos().create(todo).await.map(created_id);
        record(outcomes, path.child(NodeKind::Todo(i)), result);
    }

    if let Some(word) = word {
        let today = ctx.clock().now().date_naive();
        let result = ctx
            .daily_words()
            .create(word.to_daily_word(today))
            .await
            .map(created_id);
        record(outcomes, path.child(NodeKind::Word), result);
    }
}

fn created_id<T: Entity>(entity: T) -> String {
    entity.id().unwrap_or_default().to_string()
}

fn record(outcomes: &mut Vec<NodeOutcome>, path: NodePath, result: Result<String>) {
    let status = match result {
        Ok(id) => NodeStatus::Created { id },
        Err(e) => {
            warn!(node = %path, error = %e, "nested create failed");
            NodeStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    outcomes.push(NodeOutcome { path, status });
}

fn skip_children(
    outcomes: &mut Vec<NodeOutcome>,
    goal: NodePath,
    tasks: usize,
    todos: usize,
    word: bool,
) {
    let kinds = (0..tasks)
        .map(NodeKind::Task)
        .chain((0..todos).map(NodeKind::Todo))
        .chain(word.then_some(NodeKind::Word));
    for kind in kinds {
        outcomes.push(NodeOutcome {
            path: goal.child(kind),
            status: NodeStatus::Skipped,
        });
    }
}
