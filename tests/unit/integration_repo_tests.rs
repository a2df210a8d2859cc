//! Unit tests for `IntegrationRepo`: scan scheduling state and health.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use questlog::models::draft::Source;
use questlog::models::integration::{Integration, IntegrationStatus};
use questlog::persistence::{db, integration_repo::IntegrationRepo};

fn sample_integration(user_id: &str, source: Source) -> Integration {
    Integration::new(user_id.to_owned(), source, "token-abc".to_owned(), 15)
}

#[tokio::test]
async fn create_round_trips_all_fields() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = IntegrationRepo::new(db);

    let integration = sample_integration("u1", Source::Email);
    repo.create(&integration).await.expect("create");

    let fetched = repo
        .get_by_id(&integration.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(fetched.user_id, "u1");
    assert_eq!(fetched.source, Source::Email);
    assert_eq!(fetched.credential, "token-abc");
    assert!(fetched.enabled);
    assert_eq!(fetched.scan_frequency_minutes, 15);
    assert!(fetched.last_scan_at.is_none());
    assert_eq!(fetched.status, IntegrationStatus::Ok);
}

#[tokio::test]
async fn list_enabled_skips_disabled_and_parked() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = IntegrationRepo::new(db);

    let healthy = sample_integration("u1", Source::Email);
    let disabled = sample_integration("u2", Source::Email);
    let parked = sample_integration("u3", Source::Email);
    let other_source = sample_integration("u4", Source::BotMessage);

    repo.create(&healthy).await.expect("create");
    repo.create(&disabled).await.expect("create");
    repo.create(&parked).await.expect("create");
    repo.create(&other_source).await.expect("create");

    repo.set_enabled(&disabled.id, false).await.expect("disable");
    repo.set_status(&parked.id, IntegrationStatus::AuthError)
        .await
        .expect("park");

    let listed = repo
        .list_enabled_for_source(Source::Email)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, healthy.id);
}

#[tokio::test]
async fn advance_watermark_sets_last_scan() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = IntegrationRepo::new(db);

    let integration = sample_integration("u1", Source::Email);
    repo.create(&integration).await.expect("create");

    let mark = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    repo.advance_watermark(&integration.id, mark)
        .await
        .expect("advance");

    let fetched = repo
        .get_by_id(&integration.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(fetched.last_scan_at, Some(mark));
}

#[tokio::test]
async fn parked_integration_resumes_after_status_reset() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = IntegrationRepo::new(db);

    let integration = sample_integration("u1", Source::ChatMention);
    repo.create(&integration).await.expect("create");

    repo.set_status(&integration.id, IntegrationStatus::AuthError)
        .await
        .expect("park");
    assert!(repo
        .list_enabled_for_source(Source::ChatMention)
        .await
        .expect("list")
        .is_empty());

    repo.set_status(&integration.id, IntegrationStatus::Ok)
        .await
        .expect("restore");
    assert_eq!(
        repo.list_enabled_for_source(Source::ChatMention)
            .await
            .expect("list")
            .len(),
        1
    );
}

#[tokio::test]
async fn set_filter_rules_replaces_rules() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let repo = IntegrationRepo::new(db);

    let integration = sample_integration("u1", Source::Email);
    repo.create(&integration).await.expect("create");

    repo.set_filter_rules(&integration.id, "only urgent engineering work")
        .await
        .expect("set rules");

    let fetched = repo
        .get_by_id(&integration.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(fetched.filter_rules, "only urgent engineering work");
}
