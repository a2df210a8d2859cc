//! Integration repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::draft::Source;
use crate::models::integration::{Integration, IntegrationStatus};
use crate::{AppError, Result};

use super::codec;
use super::db::Database;

/// Repository wrapper around `SQLite` for integration records.
#[derive(Clone)]
pub struct IntegrationRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct IntegrationRow {
    id: String,
    user_id: String,
    source: String,
    credential: String,
    enabled: i64,
    scan_frequency_minutes: i64,
    last_scan_at: Option<String>,
    filter_rules: String,
    status: String,
    created_at: String,
}

impl IntegrationRow {
    /// Convert a database row into the domain model.
    fn into_integration(self) -> Result<Integration> {
        Ok(Integration {
            id: self.id,
            user_id: self.user_id,
            source: codec::parse_source(&self.source)?,
            credential: self.credential,
            enabled: self.enabled != 0,
            scan_frequency_minutes: u32::try_from(self.scan_frequency_minutes)
                .map_err(|e| AppError::Db(format!("invalid scan_frequency_minutes: {e}")))?,
            last_scan_at: codec::parse_opt_timestamp(self.last_scan_at.as_deref(), "last_scan_at")?,
            filter_rules: self.filter_rules,
            status: parse_integration_status(&self.status)?,
            created_at: codec::parse_timestamp(&self.created_at, "created_at")?,
        })
    }
}

fn parse_integration_status(s: &str) -> Result<IntegrationStatus> {
    match s {
        "ok" => Ok(IntegrationStatus::Ok),
        "auth_error" => Ok(IntegrationStatus::AuthError),
        other => Err(AppError::Db(format!("invalid integration status: {other}"))),
    }
}

fn integration_status_str(s: IntegrationStatus) -> &'static str {
    match s {
        IntegrationStatus::Ok => "ok",
        IntegrationStatus::AuthError => "auth_error",
    }
}

impl IntegrationRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new integration record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, integration: &Integration) -> Result<Integration> {
        sqlx::query(
            "INSERT INTO integration (id, user_id, source, credential, enabled,
             scan_frequency_minutes, last_scan_at, filter_rules, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&integration.id)
        .bind(&integration.user_id)
        .bind(codec::source_str(integration.source))
        .bind(&integration.credential)
        .bind(i64::from(integration.enabled))
        .bind(i64::from(integration.scan_frequency_minutes))
        .bind(integration.last_scan_at.map(|dt| dt.to_rfc3339()))
        .bind(&integration.filter_rules)
        .bind(integration_status_str(integration.status))
        .bind(integration.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(integration.clone())
    }

    /// Retrieve an integration by identifier.
    ///
    /// Returns `Ok(None)` if the integration does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Integration>> {
        let row: Option<IntegrationRow> =
            sqlx::query_as("SELECT * FROM integration WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(IntegrationRow::into_integration).transpose()
    }

    /// List all enabled, healthy integrations for one source type.
    ///
    /// Integrations in `auth_error` state are skipped until re-authorized.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_enabled_for_source(&self, source: Source) -> Result<Vec<Integration>> {
        let rows: Vec<IntegrationRow> = sqlx::query_as(
            "SELECT * FROM integration WHERE source = ?1 AND enabled = 1 AND status = 'ok'",
        )
        .bind(codec::source_str(source))
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(IntegrationRow::into_integration)
            .collect()
    }

    /// Advance the high-water mark after a completed scan.
    ///
    /// Called once per integration per scan, after the whole batch has
    /// been processed — never mid-batch, and never moved backwards.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn advance_watermark(&self, id: &str, scanned_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE integration SET last_scan_at = ?1 WHERE id = ?2")
            .bind(scanned_at.to_rfc3339())
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Update an integration's credential health.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_status(&self, id: &str, status: IntegrationStatus) -> Result<()> {
        sqlx::query("UPDATE integration SET status = ?1 WHERE id = ?2")
            .bind(integration_status_str(status))
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Enable or disable scheduled scans for an integration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE integration SET enabled = ?1 WHERE id = ?2")
            .bind(i64::from(enabled))
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Replace an integration's free-text relevance rules.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_filter_rules(&self, id: &str, rules: &str) -> Result<()> {
        sqlx::query("UPDATE integration SET filter_rules = ?1 WHERE id = ?2")
            .bind(rules)
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}
