//! User progress repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::game::Progress;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for gamification progress.
#[derive(Clone)]
pub struct ProgressRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ProgressRow {
    user_id: String,
    xp: i64,
    level: i64,
    streak_days: i64,
    last_completed_on: Option<String>,
}

impl ProgressRow {
    /// Convert a database row into the domain model.
    fn into_progress(self) -> Result<Progress> {
        let last_completed_on = self
            .last_completed_on
            .as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| AppError::Db(format!("invalid last_completed_on: {e}")))
            })
            .transpose()?;

        Ok(Progress {
            user_id: self.user_id,
            xp: u64::try_from(self.xp).map_err(|e| AppError::Db(format!("invalid xp: {e}")))?,
            level: u32::try_from(self.level)
                .map_err(|e| AppError::Db(format!("invalid level: {e}")))?,
            streak_days: u32::try_from(self.streak_days)
                .map_err(|e| AppError::Db(format!("invalid streak_days: {e}")))?,
            last_completed_on,
        })
    }
}

impl ProgressRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fetch a user's progress, or a fresh zeroed record if none exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_or_default(&self, user_id: &str) -> Result<Progress> {
        let row: Option<ProgressRow> =
            sqlx::query_as("SELECT * FROM user_progress WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        match row {
            Some(row) => row.into_progress(),
            None => Ok(Progress::new(user_id.to_owned())),
        }
    }

    /// Upsert a user's progress snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn put(&self, progress: &Progress) -> Result<()> {
        let xp = i64::try_from(progress.xp)
            .map_err(|e| AppError::Db(format!("xp out of range: {e}")))?;

        sqlx::query(
            "INSERT INTO user_progress (user_id, xp, level, streak_days, last_completed_on)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                 xp = excluded.xp,
                 level = excluded.level,
                 streak_days = excluded.streak_days,
                 last_completed_on = excluded.last_completed_on",
        )
        .bind(&progress.user_id)
        .bind(xp)
        .bind(i64::from(progress.level))
        .bind(i64::from(progress.streak_days))
        .bind(
            progress
                .last_completed_on
                .map(|d| d.format("%Y-%m-%d").to_string()),
        )
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }
}
