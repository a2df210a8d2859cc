//! Ingestion pipeline: normalized inbound items in, at most one
//! artifact (task or draft) per source event out.

pub mod pipeline;
pub mod routing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::draft::Draft;
use crate::models::task::Task;

pub use pipeline::IngestPipeline;

/// A normalized inbound item handed over by a source connector.
///
/// `source_id` must be stable across repeated fetches of the same
/// underlying item — it is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundItem {
    /// Stable identifier from the origin system.
    pub source_id: String,
    /// Natural-language payload (may be a whole thread concatenated).
    pub raw_text: String,
    /// Owning user.
    pub user_id: String,
    /// Timestamp reported by the origin system.
    pub timestamp: DateTime<Utc>,
    /// Optional extra context for extraction (thread replies, sender).
    pub context_hints: Option<String>,
}

/// Why an item was dropped without producing an artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// An artifact for this source event already exists. Expected and
    /// silent — scan windows overlap by design.
    Duplicate,
    /// The relevance filter excluded the item.
    Irrelevant,
}

/// Outcome of processing one inbound item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Item dropped before producing an artifact.
    Dropped(DropReason),
    /// Event-like content auto-created as a task.
    CreatedTask(Task),
    /// Content captured as a pending draft awaiting review.
    CreatedDraft(Draft),
}

/// One item's failure inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemError {
    /// Source id of the failed item.
    pub source_id: String,
    /// Rendered error message.
    pub message: String,
}

/// Aggregate result of one batch invocation.
///
/// Individual item failures are collected here instead of aborting the
/// batch; there is deliberately no user-facing error for a single item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    /// Tasks created directly by the routing policy.
    pub created_tasks: usize,
    /// Pending drafts created.
    pub created_drafts: usize,
    /// Items dropped as duplicates.
    pub duplicates: usize,
    /// Items dropped by the relevance filter.
    pub irrelevant: usize,
    /// Per-item failures (batch continued past each).
    pub errors: Vec<ItemError>,
}
