//! Unit tests for `TaskRepo` persistence round-trips and the
//! provenance unique index.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use questlog::models::draft::Source;
use questlog::models::task::{
    EnergyLevel, Frequency, Provenance, RecurrenceRule, Task, TaskStatus, Workspace,
};
use questlog::persistence::{db, task_repo::TaskRepo};
use questlog::AppError;

fn full_task(user_id: &str, source_id: &str) -> Task {
    let mut task = Task::new(
        user_id.to_owned(),
        "Fix login bug".to_owned(),
        Workspace::Primary,
        EnergyLevel::High,
    );
    task.description = Some("500s for new users".to_owned());
    task.estimated_minutes = Some(45);
    task.tags = vec!["bug".to_owned(), "auth".to_owned()];
    task.depends_on = vec!["task-0".to_owned()];
    task.recurrence = Some(RecurrenceRule {
        frequency: Frequency::Week,
        interval: 2,
    });
    task.due_at = Some(Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap());
    task.provenance = Some(Provenance {
        source: Source::Email,
        source_id: source_id.to_owned(),
    });
    task
}

#[tokio::test]
async fn create_round_trips_all_fields() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let task = full_task("u1", "msg-1");
    repo.create(&task).await.expect("create");

    let fetched = repo.get_by_id(&task.id).await.expect("query").expect("exists");
    assert_eq!(fetched.title, "Fix login bug");
    assert_eq!(fetched.workspace, Workspace::Primary);
    assert_eq!(fetched.energy, EnergyLevel::High);
    assert_eq!(fetched.status, TaskStatus::Todo);
    assert_eq!(fetched.estimated_minutes, Some(45));
    assert_eq!(fetched.tags, task.tags);
    assert_eq!(fetched.depends_on, task.depends_on);
    assert_eq!(fetched.recurrence, task.recurrence);
    assert_eq!(fetched.due_at, task.due_at);
    assert_eq!(fetched.provenance, task.provenance);
}

#[tokio::test]
async fn get_by_id_returns_none_for_missing() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    assert!(repo.get_by_id("nope").await.expect("query").is_none());
}

#[tokio::test]
async fn list_for_user_is_newest_first() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let mut older = full_task("u1", "msg-1");
    older.created_at = base;
    let mut newer = full_task("u1", "msg-2");
    newer.created_at = base + Duration::hours(1);

    repo.create(&older).await.expect("create older");
    repo.create(&newer).await.expect("create newer");

    let listed = repo.list_for_user("u1").await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
}

#[tokio::test]
async fn list_is_scoped_by_user() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    repo.create(&full_task("u1", "msg-1")).await.expect("create");
    repo.create(&full_task("u2", "msg-1")).await.expect("create");

    assert_eq!(repo.list_for_user("u1").await.expect("list").len(), 1);
}

#[tokio::test]
async fn update_overwrites_mutable_fields() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let mut task = full_task("u1", "msg-1");
    repo.create(&task).await.expect("create");

    task.title = "Fix login bug (prod)".to_owned();
    task.status = TaskStatus::Waiting;
    task.snoozed_until = Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
    repo.update(&task).await.expect("update");

    let fetched = repo.get_by_id(&task.id).await.expect("query").expect("exists");
    assert_eq!(fetched.title, "Fix login bug (prod)");
    assert_eq!(fetched.status, TaskStatus::Waiting);
    assert_eq!(fetched.snoozed_until, task.snoozed_until);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let task = full_task("u1", "msg-1");
    let result = repo.update(&task).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn exists_for_provenance_matches_triple() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    repo.create(&full_task("u1", "msg-1")).await.expect("create");

    assert!(repo
        .exists_for_provenance("u1", Source::Email, "msg-1")
        .await
        .expect("query"));
    // Same id under a different source is a different event.
    assert!(!repo
        .exists_for_provenance("u1", Source::BotMessage, "msg-1")
        .await
        .expect("query"));
    assert!(!repo
        .exists_for_provenance("u2", Source::Email, "msg-1")
        .await
        .expect("query"));
}

#[tokio::test]
async fn duplicate_provenance_insert_is_rejected() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    repo.create(&full_task("u1", "msg-1")).await.expect("create");
    let result = repo.create(&full_task("u1", "msg-1")).await;

    assert!(matches!(
        result,
        Err(AppError::Db(msg)) if msg.contains("UNIQUE constraint failed")
    ));
}

#[tokio::test]
async fn manual_tasks_without_provenance_never_collide() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let mut first = full_task("u1", "unused");
    first.provenance = None;
    let mut second = full_task("u1", "unused");
    second.provenance = None;

    repo.create(&first).await.expect("create first");
    repo.create(&second).await.expect("create second");
}

#[tokio::test]
async fn delete_removes_and_reports_missing() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TaskRepo::new(db);

    let task = full_task("u1", "msg-1");
    repo.create(&task).await.expect("create");
    repo.delete(&task.id).await.expect("delete");

    assert!(repo.get_by_id(&task.id).await.expect("query").is_none());
    assert!(matches!(
        repo.delete(&task.id).await,
        Err(AppError::NotFound(_))
    ));
}
