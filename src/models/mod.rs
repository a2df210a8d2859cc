//! Domain models shared across persistence, ingestion, and review.

pub mod draft;
pub mod integration;
pub mod task;
