//! Draft repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::draft::{Draft, DraftEdits, DraftStatus, Source};
use crate::{AppError, Result};

use super::codec;
use super::db::Database;

/// Repository wrapper around `SQLite` for draft records.
#[derive(Clone)]
pub struct DraftRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct DraftRow {
    id: String,
    user_id: String,
    source: String,
    source_id: String,
    title: String,
    description: Option<String>,
    workspace: String,
    energy: String,
    estimated_minutes: Option<i64>,
    tags: String,
    due_at: Option<String>,
    confidence: f64,
    status: String,
    created_at: String,
    decided_at: Option<String>,
}

impl DraftRow {
    /// Convert a database row into the domain model.
    fn into_draft(self) -> Result<Draft> {
        Ok(Draft {
            id: self.id,
            user_id: self.user_id,
            source: codec::parse_source(&self.source)?,
            source_id: self.source_id,
            title: self.title,
            description: self.description,
            workspace: codec::parse_workspace(&self.workspace)?,
            energy: codec::parse_energy(&self.energy)?,
            estimated_minutes: codec::parse_opt_minutes(self.estimated_minutes, "estimated_minutes")?,
            tags: codec::parse_string_list(&self.tags, "tags")?,
            due_at: codec::parse_opt_timestamp(self.due_at.as_deref(), "due_at")?,
            confidence: self.confidence,
            status: parse_draft_status(&self.status)?,
            created_at: codec::parse_timestamp(&self.created_at, "created_at")?,
            decided_at: codec::parse_opt_timestamp(self.decided_at.as_deref(), "decided_at")?,
        })
    }
}

fn parse_draft_status(s: &str) -> Result<DraftStatus> {
    match s {
        "pending" => Ok(DraftStatus::Pending),
        "approved" => Ok(DraftStatus::Approved),
        "rejected" => Ok(DraftStatus::Rejected),
        other => Err(AppError::Db(format!("invalid draft status: {other}"))),
    }
}

fn draft_status_str(s: DraftStatus) -> &'static str {
    match s {
        DraftStatus::Pending => "pending",
        DraftStatus::Approved => "approved",
        DraftStatus::Rejected => "rejected",
    }
}

impl DraftRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new draft record.
    ///
    /// The unique index on `(user_id, source, source_id)` rejects a
    /// second draft for the same source event regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, draft: &Draft) -> Result<Draft> {
        sqlx::query(
            "INSERT INTO draft (id, user_id, source, source_id, title, description, workspace,
             energy, estimated_minutes, tags, due_at, confidence, status, created_at, decided_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&draft.id)
        .bind(&draft.user_id)
        .bind(codec::source_str(draft.source))
        .bind(&draft.source_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(codec::workspace_str(draft.workspace))
        .bind(codec::energy_str(draft.energy))
        .bind(draft.estimated_minutes.map(i64::from))
        .bind(codec::encode_string_list(&draft.tags)?)
        .bind(draft.due_at.map(|dt| dt.to_rfc3339()))
        .bind(draft.confidence)
        .bind(draft_status_str(draft.status))
        .bind(draft.created_at.to_rfc3339())
        .bind(draft.decided_at.map(|dt| dt.to_rfc3339()))
        .execute(self.db.as_ref())
        .await?;

        Ok(draft.clone())
    }

    /// Retrieve a draft by identifier.
    ///
    /// Returns `Ok(None)` if the draft does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Draft>> {
        let row: Option<DraftRow> = sqlx::query_as("SELECT * FROM draft WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(DraftRow::into_draft).transpose()
    }

    /// List all pending drafts for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending_for_user(&self, user_id: &str) -> Result<Vec<Draft>> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            "SELECT * FROM draft WHERE user_id = ?1 AND status = 'pending'
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(DraftRow::into_draft).collect()
    }

    /// Whether any draft exists for the given source event.
    ///
    /// Counts every status, including rejected: a rejected draft keeps
    /// suppressing its source item permanently so the user's decision
    /// survives later re-scans of the same window.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn exists_for_source(
        &self,
        user_id: &str,
        source: Source,
        source_id: &str,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM draft WHERE user_id = ?1 AND source = ?2 AND source_id = ?3",
        )
        .bind(user_id)
        .bind(codec::source_str(source))
        .bind(source_id)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(count > 0)
    }

    /// Merge caller edits over a draft's proposed fields.
    ///
    /// Only pending drafts can be edited — approved and rejected drafts
    /// are immutable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the draft does not exist.
    /// Returns `AppError::AlreadyDecided` if the draft is no longer pending.
    /// Returns `AppError::Db` if the update fails.
    pub async fn apply_edits(&self, id: &str, edits: &DraftEdits) -> Result<Draft> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("draft {id} not found")))?;
        if current.status != DraftStatus::Pending {
            return Err(AppError::AlreadyDecided(format!(
                "draft {id} is {}",
                draft_status_str(current.status)
            )));
        }

        let merged = merge_edits(current, edits);
        sqlx::query(
            "UPDATE draft SET title = ?1, description = ?2, workspace = ?3, energy = ?4,
             estimated_minutes = ?5, tags = ?6, due_at = ?7
             WHERE id = ?8 AND status = 'pending'",
        )
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(codec::workspace_str(merged.workspace))
        .bind(codec::energy_str(merged.energy))
        .bind(merged.estimated_minutes.map(i64::from))
        .bind(codec::encode_string_list(&merged.tags)?)
        .bind(merged.due_at.map(|dt| dt.to_rfc3339()))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(merged)
    }

    /// Compare-and-swap a pending draft into a terminal status.
    ///
    /// Returns `true` when this call won the transition and `false` when
    /// the draft was already decided by a concurrent request. The status
    /// guard in the `WHERE` clause is what makes concurrent approvals of
    /// the same draft safe.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the draft does not exist.
    /// Returns `AppError::Db` if the update fails.
    pub async fn decide(&self, id: &str, to: DraftStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE draft SET status = ?1, decided_at = ?2 WHERE id = ?3 AND status = 'pending'",
        )
        .bind(draft_status_str(to))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        // Lost the race or the id is unknown — disambiguate.
        if self.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("draft {id} not found")));
        }
        Ok(false)
    }

    /// Force a draft back to pending, clearing its decision timestamp.
    ///
    /// Used only to roll back an approval whose task insert failed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn reopen(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE draft SET status = 'pending', decided_at = NULL WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}

/// Apply non-empty edit fields over the draft's proposed values.
fn merge_edits(mut draft: Draft, edits: &DraftEdits) -> Draft {
    if let Some(ref title) = edits.title {
        draft.title = title.clone();
    }
    if let Some(ref description) = edits.description {
        draft.description = Some(description.clone());
    }
    if let Some(workspace) = edits.workspace {
        draft.workspace = workspace;
    }
    if let Some(energy) = edits.energy {
        draft.energy = energy;
    }
    if let Some(minutes) = edits.estimated_minutes {
        draft.estimated_minutes = Some(minutes);
    }
    if let Some(ref tags) = edits.tags {
        draft.tags = tags.clone();
    }
    if let Some(due) = edits.due_at {
        draft.due_at = Some(due);
    }
    draft
}
