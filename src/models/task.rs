//! Canonical task model and its value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draft::Source;

/// Workspace a task belongs to. The taxonomy is caller-defined; these
/// three buckets are the conventional split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Workspace {
    /// Main work context.
    Primary,
    /// Side projects or secondary commitments.
    Secondary,
    /// Personal errands and life admin.
    Personal,
}

/// Energy level a task demands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    /// Deep-focus work (debugging, design).
    High,
    /// Ordinary focused work.
    Medium,
    /// Routine correspondence, calls, chores.
    Low,
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Actionable now.
    Todo,
    /// Blocked on someone or something else.
    Waiting,
    /// Completed.
    Done,
}

/// Recurrence frequency unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Daily cadence.
    Day,
    /// Weekly cadence.
    Week,
    /// Monthly cadence.
    Month,
}

/// Recurrence rule: every `interval` units of `frequency`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// Unit of recurrence.
    pub frequency: Frequency,
    /// Number of units between instances (>= 1).
    pub interval: u32,
}

impl RecurrenceRule {
    /// Compute the next due date from a base timestamp.
    #[must_use]
    pub fn next_due(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let interval = i64::from(self.interval.max(1));
        match self.frequency {
            Frequency::Day => from + chrono::Duration::days(interval),
            Frequency::Week => from + chrono::Duration::weeks(interval),
            Frequency::Month => from + chrono::Duration::days(30 * interval),
        }
    }
}

/// Structured origin metadata linking a task back to the external event
/// it was ingested from. First-class so the dedup invariant can be
/// queried, never string-embedded in the description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provenance {
    /// Origin system.
    pub source: Source,
    /// Stable identifier of the origin item (message id, event id).
    pub source_id: String,
}

/// A canonical task record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Short actionable title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Workspace bucket.
    pub workspace: Workspace,
    /// Energy demand.
    pub energy: EnergyLevel,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Estimated duration in minutes.
    pub estimated_minutes: Option<u32>,
    /// Unordered tag set.
    pub tags: Vec<String>,
    /// Ids of tasks this one depends on. A directed graph; cycles are
    /// not rejected but must never deadlock consumers.
    pub depends_on: Vec<String>,
    /// Optional recurrence rule.
    pub recurrence: Option<RecurrenceRule>,
    /// Optional due timestamp.
    pub due_at: Option<DateTime<Utc>>,
    /// Hidden from active lists until this timestamp.
    pub snoozed_until: Option<DateTime<Utc>>,
    /// Completion timestamp, set exactly once.
    pub completed_at: Option<DateTime<Utc>>,
    /// Links recurrence instances back to their template task.
    pub origin_recurrence_id: Option<String>,
    /// Origin metadata when the task was created by the ingestion
    /// pipeline; `None` for manual entries.
    pub provenance: Option<Provenance>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Construct a new todo task with a generated identifier.
    #[must_use]
    pub fn new(user_id: String, title: String, workspace: Workspace, energy: EnergyLevel) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            title,
            description: None,
            workspace,
            energy,
            status: TaskStatus::Todo,
            estimated_minutes: None,
            tags: Vec::new(),
            depends_on: Vec::new(),
            recurrence: None,
            due_at: None,
            snoozed_until: None,
            completed_at: None,
            origin_recurrence_id: None,
            provenance: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Spawn the next instance of a recurring task after completion.
    ///
    /// Clones workspace, energy, tags, and title; resets status to todo
    /// with no completion timestamp; drops dependencies (they do not
    /// carry forward); and chains `origin_recurrence_id` to the
    /// completed task's own origin-or-self so a whole chain traces to
    /// one template. Returns `None` when the task has no recurrence rule.
    #[must_use]
    pub fn spawn_next_occurrence(&self, now: DateTime<Utc>) -> Option<Self> {
        let rule = self.recurrence?;
        let next_due = rule.next_due(self.due_at.unwrap_or(now));
        let mut next = Self::new(
            self.user_id.clone(),
            self.title.clone(),
            self.workspace,
            self.energy,
        );
        next.description = self.description.clone();
        next.estimated_minutes = self.estimated_minutes;
        next.tags = self.tags.clone();
        next.recurrence = Some(rule);
        next.due_at = Some(next_due);
        next.origin_recurrence_id = Some(
            self.origin_recurrence_id
                .clone()
                .unwrap_or_else(|| self.id.clone()),
        );
        Some(next)
    }
}
