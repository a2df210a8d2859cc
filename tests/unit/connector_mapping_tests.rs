//! Unit tests for connector payload normalization.

use chrono::{DateTime, TimeZone, Utc};
use questlog::sources::bot::{update_to_item, BotMessage, BotUpdate};
use questlog::sources::chat::parse_slack_ts;
use questlog::sources::email::{message_to_item, MailMessage};

fn sample_mail() -> MailMessage {
    MailMessage {
        id: "msg-42".to_owned(),
        subject: "Quarterly report".to_owned(),
        from: "alice@example.com".to_owned(),
        body: "Please update the numbers before Friday.".to_owned(),
        date: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        thread: vec!["Earlier: draft attached.".to_owned()],
    }
}

#[test]
fn mail_message_concatenates_thread() {
    let item = message_to_item("u1", sample_mail());

    assert_eq!(item.source_id, "msg-42");
    assert_eq!(item.user_id, "u1");
    assert!(item.raw_text.starts_with("Quarterly report"));
    assert!(item.raw_text.contains("Please update the numbers"));
    assert!(item.raw_text.contains("Earlier: draft attached."));
    assert_eq!(
        item.context_hints.as_deref(),
        Some("email from alice@example.com")
    );
    assert_eq!(item.timestamp, Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
}

fn sample_update(id: i64, text: Option<&str>, date: i64) -> BotUpdate {
    BotUpdate {
        update_id: id,
        message: text.map(|t| BotMessage {
            text: Some(t.to_owned()),
            date,
        }),
    }
}

#[test]
fn bot_update_id_is_the_source_id() {
    let item = update_to_item("u1", sample_update(77, Some("remind me to call mom"), 1_750_000_000), None)
        .expect("item");

    assert_eq!(item.source_id, "77");
    assert_eq!(item.raw_text, "remind me to call mom");
    assert_eq!(item.context_hints.as_deref(), Some("bot command"));
    assert_eq!(
        item.timestamp,
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    );
}

#[test]
fn non_message_updates_are_skipped() {
    assert!(update_to_item("u1", sample_update(78, None, 0), None).is_none());
}

#[test]
fn empty_text_updates_are_skipped() {
    assert!(update_to_item("u1", sample_update(79, Some("   "), 1_750_000_000), None).is_none());
}

#[test]
fn updates_at_or_before_watermark_are_skipped() {
    let since = DateTime::from_timestamp(1_750_000_000, 0);
    assert!(update_to_item("u1", sample_update(80, Some("old news"), 1_750_000_000), since).is_none());
    assert!(
        update_to_item("u1", sample_update(81, Some("newer"), 1_750_000_001), since).is_some()
    );
}

#[test]
fn slack_ts_parses_seconds() {
    let ts = parse_slack_ts("1712345678.123456").expect("parse");
    assert_eq!(ts, DateTime::from_timestamp(1_712_345_678, 0).unwrap());
}

#[test]
fn invalid_slack_ts_is_none() {
    assert!(parse_slack_ts("not-a-ts").is_none());
    assert!(parse_slack_ts("").is_none());
}
