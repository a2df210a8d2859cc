//! Unit tests for the extraction engine and its fallback behavior.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use questlog::extract::{CompletionBackend, ExtractionEngine};
use questlog::models::task::{EnergyLevel, Workspace};
use questlog::{AppError, Result};

/// Backend returning the same canned response for every call.
struct FixedBackend(String);

impl CompletionBackend for FixedBackend {
    fn complete(
        &self,
        _system: &str,
        _user: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let out = self.0.clone();
        Box::pin(async move { Ok(out) })
    }
}

/// Backend that always fails, simulating an unreachable model.
struct FailingBackend;

impl CompletionBackend for FailingBackend {
    fn complete(
        &self,
        _system: &str,
        _user: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async { Err(AppError::Extraction("backend unreachable".into())) })
    }
}

fn engine_with(response: &str) -> ExtractionEngine {
    ExtractionEngine::new(Arc::new(FixedBackend(response.to_owned())))
}

fn failing_engine() -> ExtractionEngine {
    ExtractionEngine::new(Arc::new(FailingBackend))
}

#[tokio::test]
async fn well_formed_response_is_normalized() {
    let engine = engine_with(
        r#"{"title":"Fix login bug","energy":"high","estimated_minutes":45,
            "tags":["Bug","Auth"],"suggested_workspace":"primary","confidence":0.9}"#,
    );

    let out = engine.extract("the login page 500s for new users", None).await;

    assert_eq!(out.title, "Fix login bug");
    assert_eq!(out.energy, EnergyLevel::High);
    assert_eq!(out.estimated_minutes, 45);
    assert_eq!(out.tags, vec!["bug".to_owned(), "auth".to_owned()]);
    assert_eq!(out.suggested_workspace, Some(Workspace::Primary));
    assert!((out.confidence - 0.9).abs() < f64::EPSILON);
}

#[tokio::test]
async fn tags_are_truncated_to_three() {
    let engine = engine_with(
        r#"{"title":"Triage","energy":"medium","estimated_minutes":10,
            "tags":["one","two","three","four","five"]}"#,
    );

    let out = engine.extract("triage the queue", None).await;
    assert_eq!(out.tags.len(), 3);
}

#[tokio::test]
async fn minutes_accepts_string_numbers() {
    let engine =
        engine_with(r#"{"title":"Call the bank","energy":"low","estimated_minutes":"25"}"#);

    let out = engine.extract("call the bank about the card", None).await;
    assert_eq!(out.estimated_minutes, 25);
}

#[tokio::test]
async fn missing_confidence_gets_default() {
    let engine = engine_with(r#"{"title":"Pay rent","energy":"low","estimated_minutes":5}"#);
    let out = engine.extract("pay rent", None).await;
    assert!((out.confidence - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn out_of_range_confidence_gets_default() {
    let engine = engine_with(
        r#"{"title":"Pay rent","energy":"low","estimated_minutes":5,"confidence":3.5}"#,
    );
    let out = engine.extract("pay rent", None).await;
    assert!((out.confidence - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn inline_duration_is_split_from_title() {
    let engine = engine_with(r#"{"title":"Write summary 20m","energy":"medium"}"#);

    let out = engine.extract("write the sprint summary", None).await;
    assert_eq!(out.title, "Write summary");
    assert_eq!(out.estimated_minutes, 20);
}

#[tokio::test]
async fn hour_durations_convert_to_minutes() {
    let engine = engine_with(r#"{"title":"Deep clean the kitchen 1h","energy":"low"}"#);

    let out = engine.extract("clean the kitchen", None).await;
    assert_eq!(out.title, "Deep clean the kitchen");
    assert_eq!(out.estimated_minutes, 60);
}

#[tokio::test]
async fn model_minutes_win_over_inline_duration() {
    let engine =
        engine_with(r#"{"title":"Review PR 10m","energy":"medium","estimated_minutes":30}"#);

    let out = engine.extract("review the open PR", None).await;
    assert_eq!(out.estimated_minutes, 30);
}

#[tokio::test]
async fn backend_failure_falls_back_to_raw_text() {
    let engine = failing_engine();

    let out = engine.extract("  Ship the release notes  ", None).await;

    assert_eq!(out.title, "Ship the release notes");
    assert_eq!(out.energy, EnergyLevel::Medium);
    assert_eq!(out.estimated_minutes, 15);
    assert!(out.tags.is_empty());
    assert!(out.suggested_workspace.is_none());
    assert!((out.confidence - 0.2).abs() < f64::EPSILON);
}

#[tokio::test]
async fn malformed_json_falls_back() {
    let engine = engine_with("Sure! Here is the task you asked for:");

    let out = engine.extract("buy milk", None).await;
    assert_eq!(out.title, "buy milk");
    assert!((out.confidence - 0.2).abs() < f64::EPSILON);
}

#[tokio::test]
async fn fallback_still_parses_inline_duration() {
    let engine = failing_engine();

    let out = engine.extract("Draft blog post 1h", None).await;
    assert_eq!(out.title, "Draft blog post");
    assert_eq!(out.estimated_minutes, 60);
}

#[tokio::test]
async fn empty_input_gets_placeholder_title() {
    let engine = failing_engine();
    let out = engine.extract("   ", None).await;
    assert_eq!(out.title, "(untitled)");
}

#[tokio::test]
async fn refine_title_returns_none_on_failure() {
    let engine = failing_engine();
    let refined = engine.refine_title("Check the email thread", None).await;
    assert!(refined.is_none());
}

#[tokio::test]
async fn refine_title_never_offers_the_fallback() {
    let engine = failing_engine();
    // The fallback would strip the duration mention and return the
    // mangled title/description concatenation as a "refinement".
    let refined = engine
        .refine_title("Fix bug", Some("should take 20m"))
        .await;
    assert!(refined.is_none());
}

#[tokio::test]
async fn refine_title_skips_an_unchanged_title() {
    let engine = engine_with(r#"{"title":"Fix bug","energy":"medium"}"#);
    let refined = engine.refine_title("Fix bug", Some("the login page 500s")).await;
    assert!(refined.is_none());
}

#[tokio::test]
async fn refine_title_returns_improvement() {
    let engine = engine_with(r#"{"title":"Follow up with vendor","energy":"low"}"#);
    let refined = engine
        .refine_title("re: re: fwd: vendor stuff", Some("need a reply by friday"))
        .await;
    assert_eq!(refined.as_deref(), Some("Follow up with vendor"));
}
