//! Unit tests for `DraftRepo`: dedup lookups, edits, and the
//! compare-and-swap decision.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use questlog::models::draft::{Draft, DraftEdits, DraftStatus, Source};
use questlog::models::task::{EnergyLevel, Workspace};
use questlog::persistence::{db, draft_repo::DraftRepo};
use questlog::AppError;

fn sample_draft(user_id: &str, source_id: &str) -> Draft {
    let mut draft = Draft::new(
        user_id.to_owned(),
        Source::Email,
        source_id.to_owned(),
        "Reply to vendor".to_owned(),
        Workspace::Primary,
        EnergyLevel::Low,
    );
    draft.description = Some("They asked about renewal pricing.".to_owned());
    draft.estimated_minutes = Some(10);
    draft.tags = vec!["vendor".to_owned()];
    draft.confidence = 0.8;
    draft
}

#[tokio::test]
async fn create_round_trips_all_fields() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");

    let fetched = repo.get_by_id(&draft.id).await.expect("query").expect("exists");
    assert_eq!(fetched.title, "Reply to vendor");
    assert_eq!(fetched.source, Source::Email);
    assert_eq!(fetched.source_id, "msg-1");
    assert_eq!(fetched.status, DraftStatus::Pending);
    assert_eq!(fetched.estimated_minutes, Some(10));
    assert_eq!(fetched.tags, vec!["vendor".to_owned()]);
    assert!((fetched.confidence - 0.8).abs() < f64::EPSILON);
    assert!(fetched.decided_at.is_none());
}

#[tokio::test]
async fn duplicate_source_event_is_rejected() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    repo.create(&sample_draft("u1", "msg-1")).await.expect("create");
    let result = repo.create(&sample_draft("u1", "msg-1")).await;

    assert!(matches!(
        result,
        Err(AppError::Db(msg)) if msg.contains("UNIQUE constraint failed")
    ));
}

#[tokio::test]
async fn same_source_id_for_other_user_is_allowed() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    repo.create(&sample_draft("u1", "msg-1")).await.expect("create");
    repo.create(&sample_draft("u2", "msg-1")).await.expect("create");
}

#[tokio::test]
async fn list_pending_is_oldest_first_and_excludes_decided() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let mut first = sample_draft("u1", "msg-1");
    first.created_at = base;
    let mut second = sample_draft("u1", "msg-2");
    second.created_at = base + Duration::hours(1);
    let mut decided = sample_draft("u1", "msg-3");
    decided.created_at = base + Duration::hours(2);

    repo.create(&first).await.expect("create");
    repo.create(&second).await.expect("create");
    repo.create(&decided).await.expect("create");
    assert!(repo.decide(&decided.id, DraftStatus::Rejected).await.expect("decide"));

    let pending = repo.list_pending_for_user("u1").await.expect("list");
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[1].id, second.id);
}

#[tokio::test]
async fn exists_for_source_counts_rejected_drafts() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");
    assert!(repo.decide(&draft.id, DraftStatus::Rejected).await.expect("decide"));

    // The rejection is permanent: the source event stays suppressed.
    assert!(repo
        .exists_for_source("u1", Source::Email, "msg-1")
        .await
        .expect("query"));
    assert!(!repo
        .exists_for_source("u1", Source::ChatMention, "msg-1")
        .await
        .expect("query"));
}

#[tokio::test]
async fn apply_edits_merges_over_proposal() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");

    let edits = DraftEdits {
        title: Some("Negotiate vendor renewal".to_owned()),
        energy: Some(EnergyLevel::High),
        ..DraftEdits::default()
    };
    let merged = repo.apply_edits(&draft.id, &edits).await.expect("edit");

    assert_eq!(merged.title, "Negotiate vendor renewal");
    assert_eq!(merged.energy, EnergyLevel::High);
    // Untouched fields keep the proposed values.
    assert_eq!(merged.estimated_minutes, Some(10));
    assert_eq!(merged.workspace, Workspace::Primary);
}

#[tokio::test]
async fn apply_edits_rejects_decided_drafts() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");
    assert!(repo.decide(&draft.id, DraftStatus::Approved).await.expect("decide"));

    let result = repo.apply_edits(&draft.id, &DraftEdits::default()).await;
    assert!(matches!(result, Err(AppError::AlreadyDecided(_))));
}

#[tokio::test]
async fn decide_is_a_single_winner_cas() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");

    assert!(repo.decide(&draft.id, DraftStatus::Approved).await.expect("first"));
    // The second decision loses the race, whatever it wanted.
    assert!(!repo.decide(&draft.id, DraftStatus::Rejected).await.expect("second"));

    let fetched = repo.get_by_id(&draft.id).await.expect("query").expect("exists");
    assert_eq!(fetched.status, DraftStatus::Approved);
    assert!(fetched.decided_at.is_some());
}

#[tokio::test]
async fn decide_unknown_id_is_not_found() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let result = repo.decide("nope", DraftStatus::Approved).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn reopen_returns_draft_to_pending() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = DraftRepo::new(db);

    let draft = sample_draft("u1", "msg-1");
    repo.create(&draft).await.expect("create");
    assert!(repo.decide(&draft.id, DraftStatus::Approved).await.expect("decide"));

    repo.reopen(&draft.id).await.expect("reopen");

    let fetched = repo.get_by_id(&draft.id).await.expect("query").expect("exists");
    assert_eq!(fetched.status, DraftStatus::Pending);
    assert!(fetched.decided_at.is_none());
}
