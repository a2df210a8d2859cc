//! Relevance filter: user-rule classification that fails open.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use super::CompletionBackend;

/// Rules shorter than this are treated as "no rules configured".
const MIN_RULES_LEN: usize = 10;

const RELEVANCE_SYSTEM_PROMPT: &str = "You decide whether inbound content matters to a user, \
given their free-text rules. Respond with a single JSON object: \
{\"relevant\": bool, \"reason\": string}.";

/// Outcome of a relevance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relevance {
    /// Whether the item should be processed.
    pub relevant: bool,
    /// Human-readable rationale, useful in scan logs.
    pub reason: String,
}

#[derive(Deserialize)]
struct ModelRelevance {
    relevant: bool,
    #[serde(default)]
    reason: String,
}

/// Optional pre-extraction gate driven by per-integration user rules.
///
/// The filter is opt-in: empty or near-empty rules mean everything is
/// relevant, and any classification error also resolves to relevant.
/// Missing a task is worse than an occasional false positive the user
/// can reject, so the filter must fail open.
#[derive(Clone)]
pub struct RelevanceFilter {
    backend: Arc<dyn CompletionBackend>,
}

impl RelevanceFilter {
    /// Build a filter over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Classify one inbound summary against the user's rules.
    ///
    /// Runs before extraction so filtered-out content never spends
    /// extraction budget.
    pub async fn is_relevant(&self, summary: &str, user_rules: &str) -> Relevance {
        if user_rules.trim().len() < MIN_RULES_LEN {
            return Relevance {
                relevant: true,
                reason: "no rules configured".to_owned(),
            };
        }

        let user_prompt = format!("Rules:\n{user_rules}\n\nContent:\n{summary}");
        match self
            .backend
            .complete(RELEVANCE_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(content) => match serde_json::from_str::<ModelRelevance>(content.trim()) {
                Ok(out) => Relevance {
                    relevant: out.relevant,
                    reason: out.reason,
                },
                Err(err) => {
                    warn!(%err, "relevance response was not valid JSON, failing open");
                    fail_open()
                }
            },
            Err(err) => {
                warn!(%err, "relevance call failed, failing open");
                fail_open()
            }
        }
    }
}

fn fail_open() -> Relevance {
    Relevance {
        relevant: true,
        reason: "classification failed, defaulting to relevant".to_owned(),
    }
}
