//! Task repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::draft::Source;
use crate::models::task::{Provenance, RecurrenceRule, Task, TaskStatus};
use crate::{AppError, Result};

use super::codec;
use super::db::Database;

/// Repository wrapper around `SQLite` for canonical task records.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    workspace: String,
    energy: String,
    status: String,
    estimated_minutes: Option<i64>,
    tags: String,
    depends_on: String,
    recurrence_frequency: Option<String>,
    recurrence_interval: Option<i64>,
    due_at: Option<String>,
    snoozed_until: Option<String>,
    completed_at: Option<String>,
    origin_recurrence_id: Option<String>,
    source: Option<String>,
    source_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    /// Convert a database row into the domain model.
    fn into_task(self) -> Result<Task> {
        let recurrence = match (self.recurrence_frequency.as_deref(), self.recurrence_interval) {
            (Some(freq), Some(interval)) => Some(RecurrenceRule {
                frequency: codec::parse_frequency(freq)?,
                interval: u32::try_from(interval)
                    .map_err(|e| AppError::Db(format!("invalid recurrence_interval: {e}")))?,
            }),
            _ => None,
        };
        let provenance = match (self.source.as_deref(), self.source_id) {
            (Some(source), Some(source_id)) => Some(Provenance {
                source: codec::parse_source(source)?,
                source_id,
            }),
            _ => None,
        };

        Ok(Task {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            workspace: codec::parse_workspace(&self.workspace)?,
            energy: codec::parse_energy(&self.energy)?,
            status: parse_task_status(&self.status)?,
            estimated_minutes: codec::parse_opt_minutes(self.estimated_minutes, "estimated_minutes")?,
            tags: codec::parse_string_list(&self.tags, "tags")?,
            depends_on: codec::parse_string_list(&self.depends_on, "depends_on")?,
            recurrence,
            due_at: codec::parse_opt_timestamp(self.due_at.as_deref(), "due_at")?,
            snoozed_until: codec::parse_opt_timestamp(self.snoozed_until.as_deref(), "snoozed_until")?,
            completed_at: codec::parse_opt_timestamp(self.completed_at.as_deref(), "completed_at")?,
            origin_recurrence_id: self.origin_recurrence_id,
            provenance,
            created_at: codec::parse_timestamp(&self.created_at, "created_at")?,
            updated_at: codec::parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus> {
    match s {
        "todo" => Ok(TaskStatus::Todo),
        "waiting" => Ok(TaskStatus::Waiting),
        "done" => Ok(TaskStatus::Done),
        other => Err(AppError::Db(format!("invalid task status: {other}"))),
    }
}

fn task_status_str(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Todo => "todo",
        TaskStatus::Waiting => "waiting",
        TaskStatus::Done => "done",
    }
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task record.
    ///
    /// The partial unique index on `(user_id, source, source_id)` makes a
    /// second insert for the same provenance fail, which backstops the
    /// pipeline's dedup check under concurrent pollers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, task: &Task) -> Result<Task> {
        sqlx::query(
            "INSERT INTO task (id, user_id, title, description, workspace, energy, status,
             estimated_minutes, tags, depends_on, recurrence_frequency, recurrence_interval,
             due_at, snoozed_until, completed_at, origin_recurrence_id, source, source_id,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20)",
        )
        .bind(&task.id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(codec::workspace_str(task.workspace))
        .bind(codec::energy_str(task.energy))
        .bind(task_status_str(task.status))
        .bind(task.estimated_minutes.map(i64::from))
        .bind(codec::encode_string_list(&task.tags)?)
        .bind(codec::encode_string_list(&task.depends_on)?)
        .bind(task.recurrence.map(|r| codec::frequency_str(r.frequency)))
        .bind(task.recurrence.map(|r| i64::from(r.interval)))
        .bind(task.due_at.map(|dt| dt.to_rfc3339()))
        .bind(task.snoozed_until.map(|dt| dt.to_rfc3339()))
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&task.origin_recurrence_id)
        .bind(task.provenance.as_ref().map(|p| codec::source_str(p.source)))
        .bind(task.provenance.as_ref().map(|p| p.source_id.clone()))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(task.clone())
    }

    /// Retrieve a task by identifier.
    ///
    /// Returns `Ok(None)` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM task WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(TaskRow::into_task).transpose()
    }

    /// List all tasks for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM task WHERE user_id = ?1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Overwrite the mutable fields of an existing task.
    ///
    /// Provenance, ids, and `created_at` are never rewritten.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    /// Returns `AppError::Db` if the update fails.
    pub async fn update(&self, task: &Task) -> Result<()> {
        let result = sqlx::query(
            "UPDATE task SET title = ?1, description = ?2, workspace = ?3, energy = ?4,
             status = ?5, estimated_minutes = ?6, tags = ?7, depends_on = ?8,
             recurrence_frequency = ?9, recurrence_interval = ?10, due_at = ?11,
             snoozed_until = ?12, completed_at = ?13, updated_at = ?14
             WHERE id = ?15",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(codec::workspace_str(task.workspace))
        .bind(codec::energy_str(task.energy))
        .bind(task_status_str(task.status))
        .bind(task.estimated_minutes.map(i64::from))
        .bind(codec::encode_string_list(&task.tags)?)
        .bind(codec::encode_string_list(&task.depends_on)?)
        .bind(task.recurrence.map(|r| codec::frequency_str(r.frequency)))
        .bind(task.recurrence.map(|r| i64::from(r.interval)))
        .bind(task.due_at.map(|dt| dt.to_rfc3339()))
        .bind(task.snoozed_until.map(|dt| dt.to_rfc3339()))
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(task.updated_at.to_rfc3339())
        .bind(&task.id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("task {} not found", task.id)));
        }
        Ok(())
    }

    /// Whether any task embeds the given provenance triple.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn exists_for_provenance(
        &self,
        user_id: &str,
        source: Source,
        source_id: &str,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM task WHERE user_id = ?1 AND source = ?2 AND source_id = ?3",
        )
        .bind(user_id)
        .bind(codec::source_str(source))
        .bind(source_id)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(count > 0)
    }

    /// Hard-delete a task. Only reachable from explicit user action —
    /// the ingestion pipeline never deletes tasks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM task WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("task {id} not found")));
        }
        Ok(())
    }
}
