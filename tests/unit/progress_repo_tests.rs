//! Unit tests for `ProgressRepo` upserts.

use std::sync::Arc;

use chrono::NaiveDate;
use questlog::game::Progress;
use questlog::persistence::{db, progress_repo::ProgressRepo};

#[tokio::test]
async fn unknown_user_gets_fresh_progress() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = ProgressRepo::new(db);

    let progress = repo.get_or_default("u1").await.expect("query");
    assert_eq!(progress.xp, 0);
    assert_eq!(progress.level, 1);
    assert_eq!(progress.streak_days, 0);
    assert!(progress.last_completed_on.is_none());
}

#[tokio::test]
async fn put_round_trips_snapshot() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = ProgressRepo::new(db);

    let snapshot = Progress {
        user_id: "u1".to_owned(),
        xp: 615,
        level: 3,
        streak_days: 4,
        last_completed_on: NaiveDate::from_ymd_opt(2026, 3, 1),
    };
    repo.put(&snapshot).await.expect("put");

    let fetched = repo.get_or_default("u1").await.expect("query");
    assert_eq!(fetched, snapshot);
}

#[tokio::test]
async fn put_upserts_existing_row() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = ProgressRepo::new(db);

    let mut snapshot = Progress {
        user_id: "u1".to_owned(),
        xp: 100,
        level: 1,
        streak_days: 1,
        last_completed_on: NaiveDate::from_ymd_opt(2026, 3, 1),
    };
    repo.put(&snapshot).await.expect("first put");

    snapshot.xp = 260;
    snapshot.level = 2;
    snapshot.streak_days = 2;
    snapshot.last_completed_on = NaiveDate::from_ymd_opt(2026, 3, 2);
    repo.put(&snapshot).await.expect("second put");

    let fetched = repo.get_or_default("u1").await.expect("query");
    assert_eq!(fetched.xp, 260);
    assert_eq!(fetched.level, 2);
    assert_eq!(fetched.streak_days, 2);
}
