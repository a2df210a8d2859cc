#![forbid(unsafe_code)]

//! `questlog` — gamified personal task manager with AI-assisted capture.
//!
//! The core of the crate is the multi-source ingestion pipeline: source
//! connectors (email, chat mentions, bot messages) normalize external
//! events into inbound items, which flow through relevance filtering,
//! AI extraction, and duplicate suppression before landing as either a
//! pending [`Draft`](models::draft::Draft) awaiting review or a directly
//! created [`Task`](models::task::Task).

pub mod config;
pub mod errors;
pub mod extract;
pub mod game;
pub mod http;
pub mod ingest;
pub mod models;
pub mod persistence;
pub mod review;
pub mod scheduler;
pub mod sources;
pub mod tasks;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
