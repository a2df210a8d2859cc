//! Extraction engine: model-backed classification with a deterministic
//! fallback that never fails.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::models::task::{EnergyLevel, Workspace};

use super::{CompletionBackend, Extraction};

/// Default estimate when the model omits or mangles the duration.
const DEFAULT_MINUTES: u32 = 15;
/// Tags beyond this count are silently truncated.
const MAX_TAGS: usize = 3;
/// Fallback titles are clipped to keep garbage inputs presentable.
const MAX_FALLBACK_TITLE: usize = 120;
/// Confidence assigned when the model omits its own score.
const DEFAULT_CONFIDENCE: f64 = 0.7;
/// Confidence assigned to deterministic fallback extractions.
const FALLBACK_CONFIDENCE: f64 = 0.2;

const EXTRACT_SYSTEM_PROMPT: &str = "You turn raw text into a task. Respond with a single JSON \
object: {\"title\": string, \"energy\": \"high\"|\"medium\"|\"low\", \"estimated_minutes\": \
number, \"tags\": [string], \"suggested_workspace\": \"primary\"|\"secondary\"|\"personal\"|null, \
\"confidence\": number}. \
Bug fixes and debugging skew high energy; routine correspondence (emails, calls) skews low. \
Parse explicit duration mentions like \"20m\" out of the title into estimated_minutes.";

/// Loosely-typed model output, normalized into [`Extraction`].
#[derive(Deserialize)]
struct ModelExtraction {
    title: String,
    #[serde(default)]
    energy: Option<String>,
    #[serde(default)]
    estimated_minutes: Option<serde_json::Value>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    suggested_workspace: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Stateless extraction front-end over a [`CompletionBackend`].
///
/// `extract` never returns an error: any backend or parse failure
/// degrades to a deterministic fallback so one bad classification call
/// can never stall a whole ingestion batch.
#[derive(Clone)]
pub struct ExtractionEngine {
    backend: Arc<dyn CompletionBackend>,
    duration_re: Regex,
}

impl ExtractionEngine {
    /// Build an engine over the given backend.
    ///
    /// # Panics
    ///
    /// Never panics: the duration regex is a checked literal.
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        #[allow(clippy::unwrap_used)] // Compile-checked literal pattern.
        let duration_re =
            Regex::new(r"(?i)\b(\d{1,3})\s*(m|min|mins|minutes|h|hr|hrs|hours)\b").unwrap();
        Self {
            backend,
            duration_re,
        }
    }

    /// Extract structured task fields from a raw text blob.
    ///
    /// Always succeeds from the caller's perspective: on any underlying
    /// model failure the result is the trimmed raw text as title, medium
    /// energy, a 15-minute estimate, and no tags.
    pub async fn extract(&self, raw_text: &str, context_hints: Option<&str>) -> Extraction {
        match self.try_extract(raw_text, context_hints).await {
            Some(extraction) => extraction,
            None => self.fallback(raw_text),
        }
    }

    /// Run the model and normalize its output, or `None` on any
    /// transport or parse failure.
    async fn try_extract(&self, raw_text: &str, context_hints: Option<&str>) -> Option<Extraction> {
        let user_prompt = match context_hints {
            Some(hints) if !hints.trim().is_empty() => {
                format!("Context:\n{hints}\n\nText:\n{raw_text}")
            }
            _ => format!("Text:\n{raw_text}"),
        };

        match self
            .backend
            .complete(EXTRACT_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(content) => match serde_json::from_str::<ModelExtraction>(content.trim()) {
                Ok(model_out) => Some(self.normalize(model_out)),
                Err(err) => {
                    warn!(%err, "extraction response was not valid JSON");
                    None
                }
            },
            Err(err) => {
                warn!(%err, "extraction call failed");
                None
            }
        }
    }

    /// Best-effort title refinement used at draft approval.
    ///
    /// Returns `None` on any failure — callers keep the stored title.
    /// The deterministic fallback is never offered as a refinement: it
    /// mangles the title/description concatenation it was fed.
    pub async fn refine_title(&self, title: &str, description: Option<&str>) -> Option<String> {
        let raw = match description {
            Some(desc) if !desc.trim().is_empty() => format!("{title}\n\n{desc}"),
            _ => title.to_owned(),
        };
        let extraction = self.try_extract(&raw, None).await?;
        let refined = extraction.title.trim();
        if refined.is_empty() || refined == title.trim() {
            None
        } else {
            Some(refined.to_owned())
        }
    }

    /// Deterministic result used when the model is unavailable.
    #[must_use]
    pub fn fallback(&self, raw_text: &str) -> Extraction {
        let (title, minutes) = self.split_duration(raw_text.trim());
        Extraction {
            title: clip_title(&title),
            energy: EnergyLevel::Medium,
            estimated_minutes: minutes.unwrap_or(DEFAULT_MINUTES),
            tags: Vec::new(),
            suggested_workspace: None,
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// Coerce loosely-typed model output into the extraction contract.
    fn normalize(&self, raw: ModelExtraction) -> Extraction {
        let (title, inline_minutes) = self.split_duration(raw.title.trim());

        let energy = match raw.energy.as_deref() {
            Some("high") => EnergyLevel::High,
            Some("low") => EnergyLevel::Low,
            _ => EnergyLevel::Medium,
        };

        let model_minutes = raw.estimated_minutes.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
            serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        });
        let estimated_minutes = model_minutes
            .or(inline_minutes)
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MINUTES);

        let mut tags: Vec<String> = raw
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.truncate(MAX_TAGS);

        let suggested_workspace = match raw.suggested_workspace.as_deref() {
            Some("primary") => Some(Workspace::Primary),
            Some("secondary") => Some(Workspace::Secondary),
            Some("personal") => Some(Workspace::Personal),
            _ => None,
        };

        let confidence = raw
            .confidence
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(DEFAULT_CONFIDENCE);

        Extraction {
            title: clip_title(&title),
            energy,
            estimated_minutes,
            tags,
            suggested_workspace,
            confidence,
        }
    }

    /// Pull an inline duration mention ("20m", "1h") out of a title.
    ///
    /// Returns the title with the mention removed plus the parsed minute
    /// count, if any.
    fn split_duration(&self, title: &str) -> (String, Option<u32>) {
        let Some(caps) = self.duration_re.captures(title) else {
            return (title.to_owned(), None);
        };
        let amount: u32 = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => return (title.to_owned(), None),
        };
        let minutes = if caps[2].to_lowercase().starts_with('h') {
            amount.saturating_mul(60)
        } else {
            amount
        };
        let stripped = self
            .duration_re
            .replace(title, "")
            .trim()
            .trim_matches(|c: char| c == '-' || c == ',' || c == '(' || c == ')')
            .trim()
            .to_owned();
        if stripped.is_empty() {
            (title.to_owned(), Some(minutes.max(1)))
        } else {
            (stripped, Some(minutes.max(1)))
        }
    }
}

/// Clip a title to a presentable length on a char boundary.
fn clip_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return "(untitled)".to_owned();
    }
    title.chars().take(MAX_FALLBACK_TITLE).collect()
}
