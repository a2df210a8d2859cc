//! Task service: manual entry, edits, completion, and recurrence spawn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::game::{self, Progress};
use crate::models::task::{Task, TaskStatus};
use crate::persistence::progress_repo::ProgressRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::{AppError, Result};

/// Result of completing a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    /// The completed task.
    pub completed: Task,
    /// The next recurrence instance, when the task had a rule.
    pub spawned: Option<Task>,
    /// The user's progress after the XP award.
    pub progress: Progress,
}

/// Service for canonical task operations.
#[derive(Clone)]
pub struct TaskService {
    tasks: TaskRepo,
    progress: ProgressRepo,
}

impl TaskService {
    /// Assemble the service over the shared stores.
    #[must_use]
    pub fn new(tasks: TaskRepo, progress: ProgressRepo) -> Self {
        Self { tasks, progress }
    }

    /// Create a task from manual entry. Manual tasks carry no
    /// provenance and never participate in ingestion dedup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    pub async fn create(&self, task: &Task) -> Result<Task> {
        self.tasks.create(task).await
    }

    /// Persist user edits to a task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::Db` on storage failure.
    pub async fn edit(&self, task: &Task) -> Result<()> {
        let mut task = task.clone();
        task.updated_at = Utc::now();
        self.tasks.update(&task).await
    }

    /// Hide a task from active lists until the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub async fn snooze(&self, task_id: &str, until: DateTime<Utc>) -> Result<Task> {
        let mut task = self
            .tasks
            .get_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))?;
        task.snoozed_until = Some(until);
        task.updated_at = Utc::now();
        self.tasks.update(&task).await?;
        Ok(task)
    }

    /// Complete a task: mark done, fold the completion into the user's
    /// progress, and spawn the next recurrence instance synchronously.
    ///
    /// Progress is awarded before the spawn so a failed spawn insert
    /// never loses the XP for a completion that already stuck. The
    /// completion itself is not rolled back on a failed spawn; the
    /// error carries the task id so the instance can be recreated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::AlreadyDecided` when the task is already done.
    pub async fn complete(&self, task_id: &str) -> Result<CompletionOutcome> {
        let mut task = self
            .tasks
            .get_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))?;
        if task.status == TaskStatus::Done {
            return Err(AppError::AlreadyDecided(format!(
                "task {task_id} is already done"
            )));
        }

        let now = Utc::now();
        task.status = TaskStatus::Done;
        task.completed_at = Some(now);
        task.updated_at = now;
        self.tasks.update(&task).await?;

        let progress = game::award_completion(
            self.progress.get_or_default(&task.user_id).await?,
            &task,
            now,
        );
        self.progress.put(&progress).await?;

        // Recurrence spawn is synchronous with completion, not deferred.
        let spawned = match task.spawn_next_occurrence(now) {
            Some(next) => match self.tasks.create(&next).await {
                Ok(created) => {
                    info!(
                        task_id,
                        next_id = %created.id,
                        due_at = ?created.due_at,
                        "spawned recurrence instance"
                    );
                    Some(created)
                }
                Err(err) => {
                    warn!(task_id, %err, "recurrence spawn failed after completion");
                    return Err(err);
                }
            },
            None => None,
        };

        info!(task_id, xp = progress.xp, level = progress.level, "task completed");
        Ok(CompletionOutcome {
            completed: task,
            spawned,
            progress,
        })
    }

    /// List a user's tasks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Task>> {
        self.tasks.list_for_user(user_id).await
    }

    /// Delete a task on explicit user request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub async fn delete(&self, task_id: &str) -> Result<()> {
        self.tasks.delete(task_id).await
    }
}
