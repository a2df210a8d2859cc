//! Source connectors: one per external system, unified behind a single
//! fetch interface so the pipeline stays source-agnostic.

pub mod bot;
pub mod chat;
pub mod email;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::ingest::InboundItem;
use crate::models::draft::Source;
use crate::models::integration::Integration;
use crate::Result;

pub use bot::BotConnector;
pub use chat::ChatConnector;
pub use email::EmailConnector;

/// Uniform fetch interface implemented per source.
///
/// A connector turns its transport-specific payloads into normalized
/// [`InboundItem`]s with stable source ids, and reports credential
/// failures as [`AppError::Unauthorized`](crate::AppError::Unauthorized)
/// so the scheduler can park the integration instead of crashing.
pub trait SourceConnector: Send + Sync {
    /// The source type this connector serves.
    fn source(&self) -> Source;

    /// Fetch items newer than `since`, bounded to `max` items.
    ///
    /// `since` of `None` means a first scan (connector picks a sensible
    /// recent window). The bound is an item count, not a wall-clock
    /// timeout — processing cost downstream is dominated by extraction
    /// calls.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` on credential rejection and
    /// `AppError::Source` on transport or payload failures.
    fn fetch_since<'a>(
        &'a self,
        integration: &'a Integration,
        since: Option<DateTime<Utc>>,
        max: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<InboundItem>>> + Send + 'a>>;
}
