//! AI extraction: raw text in, structured task fields out.
//!
//! The [`CompletionBackend`] trait decouples the extraction and
//! relevance logic from the model transport so tests can substitute a
//! scripted backend. The production backend posts to an
//! OpenAI-compatible chat-completions endpoint.

pub mod engine;
pub mod model;
pub mod relevance;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::models::task::{EnergyLevel, Workspace};
use crate::Result;

pub use engine::ExtractionEngine;
pub use relevance::RelevanceFilter;

/// Structured fields extracted from a raw text blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    /// Short actionable title.
    pub title: String,
    /// Inferred energy demand.
    pub energy: EnergyLevel,
    /// Estimated duration in minutes (always positive).
    pub estimated_minutes: u32,
    /// At most three tags.
    pub tags: Vec<String>,
    /// Suggested workspace, when the model is confident.
    pub suggested_workspace: Option<Workspace>,
    /// Classification confidence in `0.0..=1.0`. Fallback extractions
    /// carry a low score so reviewers can spot them.
    pub confidence: f64,
}

/// Transport seam for language-model completions.
///
/// Implementations must be cheap to share behind an `Arc`.
pub trait CompletionBackend: Send + Sync {
    /// Run one completion and return the raw assistant text.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Extraction`](crate::AppError::Extraction) on
    /// transport or model failure. Callers are expected to recover
    /// locally — extraction falls back, the relevance filter fails open.
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}
