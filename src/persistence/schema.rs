//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates all four tables idempotently. Safe to call on every startup.
///
/// The unique indexes on `(user_id, source, source_id)` are the storage
/// backstop for the at-most-one-artifact-per-source-event invariant: even
/// if two pollers race past the pipeline's dedup check, the second insert
/// fails instead of producing a second artifact.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS task (
    id                   TEXT PRIMARY KEY NOT NULL,
    user_id              TEXT NOT NULL,
    title                TEXT NOT NULL,
    description          TEXT,
    workspace            TEXT NOT NULL CHECK(workspace IN ('primary','secondary','personal')),
    energy               TEXT NOT NULL CHECK(energy IN ('high','medium','low')),
    status               TEXT NOT NULL CHECK(status IN ('todo','waiting','done')),
    estimated_minutes    INTEGER,
    tags                 TEXT NOT NULL DEFAULT '[]',
    depends_on           TEXT NOT NULL DEFAULT '[]',
    recurrence_frequency TEXT CHECK(recurrence_frequency IN ('day','week','month')),
    recurrence_interval  INTEGER,
    due_at               TEXT,
    snoozed_until        TEXT,
    completed_at         TEXT,
    origin_recurrence_id TEXT,
    source               TEXT CHECK(source IN ('email','chat_mention','bot_message')),
    source_id            TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS draft (
    id                TEXT PRIMARY KEY NOT NULL,
    user_id           TEXT NOT NULL,
    source            TEXT NOT NULL CHECK(source IN ('email','chat_mention','bot_message')),
    source_id         TEXT NOT NULL,
    title             TEXT NOT NULL,
    description       TEXT,
    workspace         TEXT NOT NULL CHECK(workspace IN ('primary','secondary','personal')),
    energy            TEXT NOT NULL CHECK(energy IN ('high','medium','low')),
    estimated_minutes INTEGER,
    tags              TEXT NOT NULL DEFAULT '[]',
    due_at            TEXT,
    confidence        REAL NOT NULL DEFAULT 0.5,
    status            TEXT NOT NULL CHECK(status IN ('pending','approved','rejected')),
    created_at        TEXT NOT NULL,
    decided_at        TEXT
);

CREATE TABLE IF NOT EXISTS integration (
    id                     TEXT PRIMARY KEY NOT NULL,
    user_id                TEXT NOT NULL,
    source                 TEXT NOT NULL CHECK(source IN ('email','chat_mention','bot_message')),
    credential             TEXT NOT NULL,
    enabled                INTEGER NOT NULL DEFAULT 1,
    scan_frequency_minutes INTEGER NOT NULL,
    last_scan_at           TEXT,
    filter_rules           TEXT NOT NULL DEFAULT '',
    status                 TEXT NOT NULL CHECK(status IN ('ok','auth_error')),
    created_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_progress (
    user_id           TEXT PRIMARY KEY NOT NULL,
    xp                INTEGER NOT NULL DEFAULT 0,
    level             INTEGER NOT NULL DEFAULT 1,
    streak_days       INTEGER NOT NULL DEFAULT 0,
    last_completed_on TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_draft_source_event
    ON draft(user_id, source, source_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_task_provenance
    ON task(user_id, source, source_id) WHERE source_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_task_user ON task(user_id);
CREATE INDEX IF NOT EXISTS idx_draft_user_status ON draft(user_id, status);
CREATE INDEX IF NOT EXISTS idx_integration_source ON integration(source, enabled);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
