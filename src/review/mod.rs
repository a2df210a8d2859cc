//! Draft review: approve, reject, and bulk operations.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::extract::ExtractionEngine;
use crate::models::draft::{Draft, DraftEdits, DraftStatus};
use crate::models::task::{Provenance, Task};
use crate::persistence::draft_repo::DraftRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::{AppError, Result};

/// Per-id result of a bulk approve/reject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Draft id this entry refers to.
    pub id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Created task id on successful approval.
    pub task_id: Option<String>,
    /// Rendered error on failure.
    pub error: Option<String>,
}

/// Service exposing the draft review lifecycle.
///
/// Approval and rejection are terminal: the status transition is a
/// compare-and-swap in the store, so of two concurrent decisions on the
/// same draft exactly one wins and the other sees `AlreadyDecided`.
#[derive(Clone)]
pub struct ReviewService {
    drafts: DraftRepo,
    tasks: TaskRepo,
    engine: ExtractionEngine,
}

impl ReviewService {
    /// Assemble the service over the shared stores and engine.
    #[must_use]
    pub fn new(drafts: DraftRepo, tasks: TaskRepo, engine: ExtractionEngine) -> Self {
        Self {
            drafts,
            tasks,
            engine,
        }
    }

    /// Approve a draft, promoting it to a task.
    ///
    /// Runs a light best-effort title refinement (failures keep the
    /// stored title), merges caller edits over the draft's proposal
    /// (edits win over the refinement), flips the status with a CAS,
    /// and creates the task carrying the draft's provenance. A failed
    /// task insert reopens the draft so the approval can be retried.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id,
    /// `AppError::AlreadyDecided` when the draft is no longer pending,
    /// and `AppError::Db` on storage failure.
    pub async fn approve(&self, draft_id: &str, edits: Option<DraftEdits>) -> Result<Task> {
        let draft = self
            .drafts
            .get_by_id(draft_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("draft {draft_id} not found")))?;
        if draft.status != DraftStatus::Pending {
            return Err(AppError::AlreadyDecided(format!(
                "draft {draft_id} has already been decided"
            )));
        }

        // Best-effort refinement; the stored title is the fallback.
        let refined = self
            .engine
            .refine_title(&draft.title, draft.description.as_deref())
            .await;

        let draft = match edits {
            Some(ref edits) => self.drafts.apply_edits(draft_id, edits).await?,
            None => draft,
        };
        let title_from_edits = edits.as_ref().and_then(|e| e.title.clone());

        if !self.drafts.decide(draft_id, DraftStatus::Approved).await? {
            return Err(AppError::AlreadyDecided(format!(
                "draft {draft_id} was decided concurrently"
            )));
        }

        let task = build_task(&draft, title_from_edits.or(refined));
        match self.tasks.create(&task).await {
            Ok(created) => {
                info!(draft_id, task_id = %created.id, "draft approved");
                Ok(created)
            }
            Err(err) => {
                // Undo the status flip so the approval can be retried.
                if let Err(reopen_err) = self.drafts.reopen(draft_id).await {
                    warn!(draft_id, %reopen_err, "failed to reopen draft after task insert failure");
                }
                Err(err)
            }
        }
    }

    /// Reject a draft. Terminal: the rejected record keeps suppressing
    /// its source event on all future scans.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::AlreadyDecided` when the draft is no longer pending.
    pub async fn reject(&self, draft_id: &str) -> Result<()> {
        if !self.drafts.decide(draft_id, DraftStatus::Rejected).await? {
            return Err(AppError::AlreadyDecided(format!(
                "draft {draft_id} has already been decided"
            )));
        }
        info!(draft_id, "draft rejected");
        Ok(())
    }

    /// Apply pre-approval edits to a pending draft.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::AlreadyDecided` for a decided draft.
    pub async fn edit(&self, draft_id: &str, edits: &DraftEdits) -> Result<Draft> {
        self.drafts.apply_edits(draft_id, edits).await
    }

    /// Approve a list of drafts, collecting per-id outcomes.
    ///
    /// One failure never aborts the rest of the list.
    pub async fn approve_many(&self, draft_ids: &[String]) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(draft_ids.len());
        for id in draft_ids {
            let outcome = match self.approve(id, None).await {
                Ok(task) => BulkOutcome {
                    id: id.clone(),
                    ok: true,
                    task_id: Some(task.id),
                    error: None,
                },
                Err(err) => BulkOutcome {
                    id: id.clone(),
                    ok: false,
                    task_id: None,
                    error: Some(err.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Reject a list of drafts, collecting per-id outcomes.
    ///
    /// One failure never aborts the rest of the list.
    pub async fn reject_many(&self, draft_ids: &[String]) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(draft_ids.len());
        for id in draft_ids {
            let outcome = match self.reject(id).await {
                Ok(()) => BulkOutcome {
                    id: id.clone(),
                    ok: true,
                    task_id: None,
                    error: None,
                },
                Err(err) => BulkOutcome {
                    id: id.clone(),
                    ok: false,
                    task_id: None,
                    error: Some(err.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Materialize a task from an approved draft.
fn build_task(draft: &Draft, refined_title: Option<String>) -> Task {
    let mut task = Task::new(
        draft.user_id.clone(),
        refined_title.unwrap_or_else(|| draft.title.clone()),
        draft.workspace,
        draft.energy,
    );
    task.description = draft.description.clone();
    task.estimated_minutes = draft.estimated_minutes;
    task.tags = draft.tags.clone();
    task.due_at = draft.due_at;
    task.provenance = Some(Provenance {
        source: draft.source,
        source_id: draft.source_id.clone(),
    });
    task
}
