//! Draft model: an AI-proposed task candidate awaiting human review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{EnergyLevel, Workspace};

/// External system a draft or task was captured from.
///
/// The dedup key `(user, source, source_id)` is scoped per source, so
/// connectors for different sources can never collide with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Email thread.
    Email,
    /// Chat message mentioning the bot.
    ChatMention,
    /// Direct bot command or message.
    BotMessage,
}

/// Lifecycle status for a draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Awaiting a review decision.
    Pending,
    /// Promoted to a task. Terminal.
    Approved,
    /// Declined by the user. Terminal — the source item stays
    /// suppressed so it never resurfaces on later scans.
    Rejected,
}

/// An AI-extracted task candidate awaiting approval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    /// Unique record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Origin system.
    pub source: Source,
    /// Stable identifier of the origin item (message id, event id).
    pub source_id: String,
    /// Proposed task title.
    pub title: String,
    /// Proposed description.
    pub description: Option<String>,
    /// Proposed workspace.
    pub workspace: Workspace,
    /// Proposed energy level.
    pub energy: EnergyLevel,
    /// Proposed estimated duration in minutes.
    pub estimated_minutes: Option<u32>,
    /// Proposed tags.
    pub tags: Vec<String>,
    /// Proposed due timestamp.
    pub due_at: Option<DateTime<Utc>>,
    /// Extraction confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Review status.
    pub status: DraftStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the approve/reject decision.
    pub decided_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Construct a new pending draft with a generated identifier.
    #[must_use]
    pub fn new(
        user_id: String,
        source: Source,
        source_id: String,
        title: String,
        workspace: Workspace,
        energy: EnergyLevel,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            source,
            source_id,
            title,
            description: None,
            workspace,
            energy,
            estimated_minutes: None,
            tags: Vec::new(),
            due_at: None,
            confidence: 0.5,
            status: DraftStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        }
    }
}

/// Caller-supplied field overrides merged over a draft's proposal at
/// approval time. Absent fields keep the draft's proposed values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftEdits {
    /// Override the title.
    pub title: Option<String>,
    /// Override the description.
    pub description: Option<String>,
    /// Override the workspace.
    pub workspace: Option<Workspace>,
    /// Override the energy level.
    pub energy: Option<EnergyLevel>,
    /// Override the estimated duration.
    pub estimated_minutes: Option<u32>,
    /// Override the tags.
    pub tags: Option<Vec<String>>,
    /// Override the due timestamp.
    pub due_at: Option<DateTime<Utc>>,
}
