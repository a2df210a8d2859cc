//! Per-user source integration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draft::Source;

/// Health of a source integration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    /// Credentials accepted on the most recent scan.
    Ok,
    /// Credentials rejected — scans are skipped until re-authorized.
    AuthError,
}

/// Connection between one user and one external source.
///
/// `last_scan_at` is the high-water mark: the next scan fetches items
/// newer than this timestamp. The mark is deliberately coarse — scans
/// re-cover overlapping windows and rely on dedup for correctness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Integration {
    /// Unique record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// External source this integration connects to.
    pub source: Source,
    /// Opaque credential blob (token ciphertext), decrypted by the
    /// connector that uses it.
    pub credential: String,
    /// Whether the scheduler should scan this integration.
    pub enabled: bool,
    /// Minimum minutes between scans.
    pub scan_frequency_minutes: u32,
    /// High-water mark of the last completed scan.
    pub last_scan_at: Option<DateTime<Utc>>,
    /// Free-text relevance rules; items failing them are dropped
    /// before extraction. Empty or near-empty means "everything is
    /// relevant".
    pub filter_rules: String,
    /// Credential health.
    pub status: IntegrationStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Integration {
    /// Construct a new enabled integration with a generated identifier.
    #[must_use]
    pub fn new(
        user_id: String,
        source: Source,
        credential: String,
        scan_frequency_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            source,
            credential,
            enabled: true,
            scan_frequency_minutes,
            last_scan_at: None,
            filter_rules: String::new(),
            status: IntegrationStatus::Ok,
            created_at: Utc::now(),
        }
    }

    /// Whether this integration is due for a scan at `now`.
    ///
    /// A never-scanned integration is always due. The check is
    /// self-throttling: the scheduler tick can run far more often than
    /// any integration's effective cadence.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_scan_at {
            None => true,
            Some(last) => {
                now - last >= chrono::Duration::minutes(i64::from(self.scan_frequency_minutes))
            }
        }
    }
}
