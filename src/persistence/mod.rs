//! `SQLite` persistence: connection bootstrap and per-aggregate repositories.

pub(crate) mod codec;
pub mod db;
pub mod draft_repo;
pub mod integration_repo;
pub mod progress_repo;
pub mod schema;
pub mod task_repo;
