//! Shared fixtures for the end-to-end flow tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use questlog::extract::{CompletionBackend, ExtractionEngine, RelevanceFilter};
use questlog::ingest::{InboundItem, IngestPipeline};
use questlog::persistence::db::Database;
use questlog::persistence::draft_repo::DraftRepo;
use questlog::persistence::task_repo::TaskRepo;
use questlog::{AppError, Result};

/// Backend returning the same canned response for every call.
pub struct FixedBackend(pub String);

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
pub struct FailingBackend;

impl CompletionBackend for FailingBackend {
    fn complete(
        &self,
        _system: &str,
        _user: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async { Err(AppError::Extraction("backend unreachable".into())) })
    }
}

/// Extraction engine scripted with a fixed model response.
pub fn engine_with(response: &str) -> ExtractionEngine {
    ExtractionEngine::new(Arc::new(FixedBackend(response.to_owned())))
}

/// Extraction engine whose backend always fails (forces the fallback).
pub fn failing_engine() -> ExtractionEngine {
    ExtractionEngine::new(Arc::new(FailingBackend))
}

/// Relevance filter that lets everything through (its backend fails,
/// and the filter fails open).
pub fn open_filter() -> RelevanceFilter {
    RelevanceFilter::new(Arc::new(FailingBackend))
}

/// Relevance filter scripted with a fixed classification response.
pub fn filter_with(response: &str) -> RelevanceFilter {
    RelevanceFilter::new(Arc::new(FixedBackend(response.to_owned())))
}

/// Pipeline over an in-memory store with the given extraction stack.
pub fn pipeline(
    db: &Arc<Database>,
    engine: ExtractionEngine,
    filter: RelevanceFilter,
) -> IngestPipeline {
    IngestPipeline::new(
        TaskRepo::new(Arc::clone(db)),
        DraftRepo::new(Arc::clone(db)),
        engine,
        filter,
    )
}

/// Inbound item with a fixed timestamp.
pub fn item(user_id: &str, source_id: &str, raw_text: &str, timestamp: DateTime<Utc>) -> InboundItem {
    InboundItem {
        source_id: source_id.to_owned(),
        raw_text: raw_text.to_owned(),
        user_id: user_id.to_owned(),
        timestamp,
        context_hints: None,
    }
}
