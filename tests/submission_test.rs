//! Integration tests for hierarchical vision submission.
//!
//! These tests verify that `submit_vision`:
//! - Creates the vision, then each goal, then each goal's tasks, todos and word
//! - Wires parent ids into every child before it is dispatched
//! - Keeps going when a nested create fails, and reports which node failed
//! - Builds the same graph in the local store when the backend is down

mod common;

use common::{FakeBackend, TEST_USER, context};
use lifeplan::models::{GoalDraft, MilestoneDraft, VisionDraft, WordCommitment};
use lifeplan::{
    Error, Goal, ListFilter, Method, NodeKind, NodePath, NodeStatus, ResourceKind, Task, Todo,
    Vision,
};
use serde_json::Value;

fn goal_draft(name: &str) -> GoalDraft {
    GoalDraft::new(Goal::new(name))
        .with_task(Task::new(format!("{name} task")))
        .with_todo(Todo::new(format!("{name} todo")))
        .with_word(WordCommitment::new(format!("{name} word")))
}

/// Vision with two milestones, each holding one fully populated goal.
fn two_milestone_draft() -> VisionDraft {
    VisionDraft::new(Vision::new("Health"))
        .with_milestone(MilestoneDraft::new("Q1").with_goal(goal_draft("Run 5k")))
        .with_milestone(MilestoneDraft::new("Q2").with_goal(goal_draft("Run 10k")))
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

#[tokio::test]
async fn test_two_milestone_submission_creates_full_graph() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);

    let report = ctx.submit_vision(two_milestone_draft()).await.unwrap();
    assert!(report.is_complete());
    let vision_id = report.vision_id().to_string();
    assert!(vision_id.starts_with("srv-"));

    assert_eq!(backend.records("/visions").len(), 1);
    let goals = backend.records("/goals");
    let tasks = backend.records("/tasks");
    let todos = backend.records("/todos");
    let words = backend.records("/daily-words");
    assert_eq!((goals.len(), tasks.len(), todos.len(), words.len()), (2, 2, 2, 2));

    for goal in &goals {
        assert_eq!(str_field(goal, "visionId"), Some(vision_id.as_str()));
    }
    for (i, goal) in goals.iter().enumerate() {
        let goal_id = str_field(goal, "id");
        for child in [&tasks[i], &todos[i]] {
            assert_eq!(str_field(child, "goalId"), goal_id);
            assert_eq!(str_field(child, "visionId"), Some(vision_id.as_str()));
        }
    }
    for word in &words {
        // Undated commitments land on the submission date
        assert_eq!(str_field(word, "date"), Some("2026-03-15"));
        assert_eq!(str_field(word, "userId"), Some(TEST_USER));
    }

    // Milestones are a grouping construct only
    let vision_body = &backend.created_bodies("/visions")[0];
    assert!(vision_body.get("milestones").is_none());
}

#[tokio::test]
async fn test_children_are_dispatched_after_their_parents() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);
    ctx.submit_vision(two_milestone_draft()).await.unwrap();

    let order: Vec<String> = backend
        .data_requests()
        .into_iter()
        .filter(|r| r.method == Method::Post)
        .map(|r| r.path)
        .collect();
    assert_eq!(
        order,
        vec![
            "/visions",
            "/goals",
            "/tasks",
            "/todos",
            "/daily-words",
            "/goals",
            "/tasks",
            "/todos",
            "/daily-words",
        ]
    );

    // Every goal body already carries the vision id when it is sent
    let vision_id = str_field(&backend.records("/visions")[0], "id").map(str::to_string);
    for body in backend.created_bodies("/goals") {
        assert_eq!(str_field(&body, "visionId").map(str::to_string), vision_id);
    }
    for body in backend.created_bodies("/tasks") {
        assert!(str_field(&body, "goalId").is_some_and(|id| id.starts_with("srv-")));
    }
}

#[tokio::test]
async fn test_remote_goal_failure_does_not_stop_siblings() {
    let backend = FakeBackend::new();
    backend.fail_create("/goals", "name", "Broken");
    let ctx = context(&backend);

    let draft = VisionDraft::new(Vision::new("Career"))
        .with_milestone(
            MilestoneDraft::new("H1")
                .with_goal(goal_draft("Broken"))
                .with_goal(goal_draft("Learn Rust")),
        )
        .with_milestone(MilestoneDraft::new("H2").with_goal(goal_draft("Ship it")));
    let report = ctx.submit_vision(draft).await.unwrap();

    // The forced remote failure falls back to the local store, so the goal
    // still exists, just under a local id.
    let broken = report
        .outcome(NodePath {
            milestone: 0,
            goal: 0,
            kind: NodeKind::Goal,
        })
        .unwrap();
    assert!(matches!(broken, NodeStatus::Created { id } if id.starts_with("local-goal-")));

    let remote_goals: Vec<String> = backend
        .records("/goals")
        .iter()
        .filter_map(|g| str_field(g, "name").map(str::to_string))
        .collect();
    assert_eq!(remote_goals, vec!["Learn Rust", "Ship it"]);
    assert_eq!(backend.records("/tasks").len(), 3);
}

#[tokio::test]
async fn test_invalid_nested_nodes_are_reported_and_skipped() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);

    let mut bad_task = Task::new("bad time");
    bad_task.time = Some("25:99".into());
    let draft = VisionDraft::new(Vision::new("Family")).with_milestone(
        MilestoneDraft::new("All year")
            .with_goal(goal_draft("  "))
            .with_goal(
                GoalDraft::new(Goal::new("Dinners"))
                    .with_task(bad_task)
                    .with_task(Task::new("Book table")),
            ),
    );
    let report = ctx.submit_vision(draft).await.unwrap();

    let statuses: Vec<(NodeKind, &NodeStatus)> = report
        .outcomes
        .iter()
        .map(|o| (o.path.kind, &o.status))
        .collect();
    assert!(matches!(statuses[0], (NodeKind::Goal, NodeStatus::Failed { .. })));
    assert_eq!(statuses[1], (NodeKind::Task(0), &NodeStatus::Skipped));
    assert_eq!(statuses[2], (NodeKind::Todo(0), &NodeStatus::Skipped));
    assert_eq!(statuses[3], (NodeKind::Word, &NodeStatus::Skipped));
    assert!(matches!(statuses[4], (NodeKind::Goal, NodeStatus::Created { .. })));
    assert!(matches!(statuses[5], (NodeKind::Task(0), NodeStatus::Failed { .. })));
    assert!(matches!(statuses[6], (NodeKind::Task(1), NodeStatus::Created { .. })));

    assert_eq!(report.failures().count(), 2);
    assert_eq!(report.skipped().count(), 3);
    assert_eq!(backend.records("/tasks").len(), 1);
}

#[tokio::test]
async fn test_word_with_target_date_uses_that_date() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);

    let mut word = WordCommitment::new("Courage");
    word.date_time = chrono::NaiveDate::from_ymd_opt(2026, 6, 1)
        .and_then(|d| d.and_hms_opt(7, 0, 0));
    let goal = GoalDraft::new(Goal::new("Meditate")).with_word(word);
    let draft = VisionDraft::new(Vision::new("Mind"))
        .with_milestone(MilestoneDraft::new("Spring").with_goal(goal));
    ctx.submit_vision(draft).await.unwrap();

    let words = backend.records("/daily-words");
    assert_eq!(words.len(), 1);
    assert_eq!(str_field(&words[0], "word"), Some("Courage"));
    assert_eq!(str_field(&words[0], "date"), Some("2026-06-01"));
}

#[tokio::test]
async fn test_blank_word_is_not_created() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);
    let draft = VisionDraft::new(Vision::new("Mind")).with_milestone(
        MilestoneDraft::new("Spring")
            .with_goal(GoalDraft::new(Goal::new("Journal")).with_word(WordCommitment::new(" "))),
    );
    let report = ctx.submit_vision(draft).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert!(backend.records("/daily-words").is_empty());
}

#[tokio::test]
async fn test_offline_submission_builds_graph_locally() {
    let backend = FakeBackend::offline();
    let ctx = context(&backend);

    let report = ctx.submit_vision(two_milestone_draft()).await.unwrap();
    assert!(report.is_complete());
    assert!(report.vision_id().starts_with("local-vision-"));

    // Only the initial probe reached the transport
    assert_eq!(backend.requests().len(), 1);
    assert_eq!(backend.probe_count(), 1);

    let store = ctx.store().lock().await;
    assert_eq!(store.count(ResourceKind::Vision), 1);
    assert_eq!(store.count(ResourceKind::Goal), 2);
    assert_eq!(store.count(ResourceKind::Task), 2);
    assert_eq!(store.count(ResourceKind::Todo), 2);
    assert_eq!(store.count(ResourceKind::DailyWord), 2);

    let goals: Vec<Goal> = store.list_as(Some(TEST_USER), &ListFilter::none());
    let tasks: Vec<Task> = store.list_as(Some(TEST_USER), &ListFilter::none());
    for goal in &goals {
        assert_eq!(goal.vision_id.as_deref(), Some(report.vision_id()));
        assert!(goal.id.as_deref().unwrap().starts_with("local-goal-"));
    }
    for (goal, task) in goals.iter().zip(&tasks) {
        assert_eq!(task.goal_id, goal.id);
        assert_eq!(task.vision_id.as_deref(), Some(report.vision_id()));
    }
}

#[tokio::test]
async fn test_invalid_vision_aborts_submission() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);

    let draft = VisionDraft::new(Vision::new("")).with_milestone(
        MilestoneDraft::new("Q1").with_goal(goal_draft("Orphan")),
    );
    let err = ctx.submit_vision(draft).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(backend.records("/goals").is_empty());
}

#[tokio::test]
async fn test_submission_from_form_json() {
    let backend = FakeBackend::new();
    let ctx = context(&backend);

    let draft: VisionDraft = serde_json::from_value(serde_json::json!({
        "title": "Wealth",
        "category": "Finance",
        "budget": "5000",
        "milestones": [{
            "name": "Save",
            "goals": [{
                "name": "Emergency fund",
                "startTime": "09:00",
                "tasks": [{"name": "Open account"}],
                "todos": [],
                "myWord": {"text": ""}
            }]
        }]
    }))
    .unwrap();
    let report = ctx.submit_vision(draft).await.unwrap();

    assert_eq!(report.vision.budget, Some(5000.0));
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_complete());
}
