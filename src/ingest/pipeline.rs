//! The ingestion pipeline orchestrating dedup, relevance, extraction,
//! and routing for every inbound item.

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::extract::{ExtractionEngine, RelevanceFilter};
use crate::models::draft::{Draft, Source};
use crate::models::task::{Provenance, Task, Workspace};
use crate::persistence::draft_repo::DraftRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::{AppError, Result};

use super::routing::EventRouter;
use super::{BatchReport, DropReason, InboundItem, IngestOutcome, ItemError};

/// Tag applied to auto-created event tasks.
const MEETING_TAG: &str = "meeting";

/// Source-agnostic ingestion pipeline.
///
/// Scheduled pollers and manual scan-now triggers share this single
/// entry point so dedup behavior can never diverge between the two.
#[derive(Clone)]
pub struct IngestPipeline {
    tasks: TaskRepo,
    drafts: DraftRepo,
    engine: ExtractionEngine,
    filter: RelevanceFilter,
    router: EventRouter,
}

impl IngestPipeline {
    /// Assemble a pipeline over the shared stores and extraction stack.
    #[must_use]
    pub fn new(
        tasks: TaskRepo,
        drafts: DraftRepo,
        engine: ExtractionEngine,
        filter: RelevanceFilter,
    ) -> Self {
        Self {
            tasks,
            drafts,
            engine,
            filter,
            router: EventRouter::new(),
        }
    }

    /// Process one normalized inbound item.
    ///
    /// The dedup check runs first and cheaply, before any extraction
    /// budget is spent. A duplicate is a silent, idempotent no-op —
    /// connectors re-scan overlapping windows by design.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` for malformed payloads and
    /// `AppError::Db` for storage failures. Extraction and relevance
    /// failures never surface here — they degrade locally.
    pub async fn process_item(
        &self,
        item: &InboundItem,
        source: Source,
        filter_rules: &str,
    ) -> Result<IngestOutcome> {
        if item.source_id.trim().is_empty() {
            return Err(AppError::Source("inbound item has empty source_id".into()));
        }
        if item.raw_text.trim().is_empty() {
            return Err(AppError::Source(format!(
                "inbound item {} has empty payload",
                item.source_id
            )));
        }

        // ── 1. Dedup check (before any AI cost) ──────────────
        if self.already_ingested(item, source).await? {
            debug!(
                user_id = %item.user_id,
                source_id = %item.source_id,
                "duplicate source event, dropping"
            );
            return Ok(IngestOutcome::Dropped(DropReason::Duplicate));
        }

        // ── 2. Relevance filter (opt-in, fail-open) ──────────
        let relevance = self.filter.is_relevant(&item.raw_text, filter_rules).await;
        if !relevance.relevant {
            info!(
                user_id = %item.user_id,
                source_id = %item.source_id,
                reason = %relevance.reason,
                "item filtered as irrelevant"
            );
            return Ok(IngestOutcome::Dropped(DropReason::Irrelevant));
        }

        // ── 3. Extraction (never fails) ──────────────────────
        let extraction = self
            .engine
            .extract(&item.raw_text, item.context_hints.as_deref())
            .await;

        // ── 4. Routing policy ────────────────────────────────
        if self.router.is_event_like(&item.raw_text, &extraction.title) {
            return self.create_event_task(item, source, extraction).await;
        }
        self.create_draft(item, source, extraction).await
    }

    /// Process up to `max` items, continuing past per-item failures.
    ///
    /// One poisoned message records an error in the report and the batch
    /// moves on to the next item.
    pub async fn process_batch(
        &self,
        items: &[InboundItem],
        source: Source,
        filter_rules: &str,
        max: usize,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for item in items.iter().take(max) {
            let outcome = self
                .process_item(item, source, filter_rules)
                .instrument(info_span!(
                    "ingest_item",
                    source_id = %item.source_id,
                    user_id = %item.user_id,
                ))
                .await;

            match outcome {
                Ok(IngestOutcome::CreatedTask(_)) => report.created_tasks += 1,
                Ok(IngestOutcome::CreatedDraft(_)) => report.created_drafts += 1,
                Ok(IngestOutcome::Dropped(DropReason::Duplicate)) => report.duplicates += 1,
                Ok(IngestOutcome::Dropped(DropReason::Irrelevant)) => report.irrelevant += 1,
                Err(err) => {
                    warn!(
                        source_id = %item.source_id,
                        %err,
                        "item failed, continuing batch"
                    );
                    report.errors.push(ItemError {
                        source_id: item.source_id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            created_tasks = report.created_tasks,
            created_drafts = report.created_drafts,
            duplicates = report.duplicates,
            irrelevant = report.irrelevant,
            errors = report.errors.len(),
            "batch complete"
        );
        report
    }

    /// Whether any artifact (draft in any status, or task provenance)
    /// already embeds this source event.
    async fn already_ingested(&self, item: &InboundItem, source: Source) -> Result<bool> {
        if self
            .drafts
            .exists_for_source(&item.user_id, source, &item.source_id)
            .await?
        {
            return Ok(true);
        }
        self.tasks
            .exists_for_provenance(&item.user_id, source, &item.source_id)
            .await
    }

    /// Auto-create a `meeting` task for event-like content.
    async fn create_event_task(
        &self,
        item: &InboundItem,
        source: Source,
        extraction: crate::extract::Extraction,
    ) -> Result<IngestOutcome> {
        let workspace = extraction.suggested_workspace.unwrap_or(Workspace::Primary);
        let mut task = Task::new(
            item.user_id.clone(),
            extraction.title,
            workspace,
            extraction.energy,
        );
        task.estimated_minutes = Some(extraction.estimated_minutes);
        task.tags = extraction.tags;
        if !task.tags.iter().any(|t| t == MEETING_TAG) {
            task.tags.push(MEETING_TAG.to_owned());
        }
        // Event tasks are time-sensitive: due from the source's own
        // timestamp (e.g. the email Date header).
        task.due_at = Some(item.timestamp);
        task.provenance = Some(Provenance {
            source,
            source_id: item.source_id.clone(),
        });

        match self.tasks.create(&task).await {
            Ok(created) => {
                info!(task_id = %created.id, source_id = %item.source_id, "auto-created event task");
                Ok(IngestOutcome::CreatedTask(created))
            }
            Err(err) if is_unique_violation(&err) => {
                // A concurrent poller won the insert race; the invariant
                // held at the storage layer.
                Ok(IngestOutcome::Dropped(DropReason::Duplicate))
            }
            Err(err) => Err(err),
        }
    }

    /// Capture non-event content as a pending draft.
    async fn create_draft(
        &self,
        item: &InboundItem,
        source: Source,
        extraction: crate::extract::Extraction,
    ) -> Result<IngestOutcome> {
        let workspace = extraction.suggested_workspace.unwrap_or(Workspace::Primary);
        let mut draft = Draft::new(
            item.user_id.clone(),
            source,
            item.source_id.clone(),
            extraction.title,
            workspace,
            extraction.energy,
        );
        draft.description = Some(item.raw_text.clone());
        draft.estimated_minutes = Some(extraction.estimated_minutes);
        draft.tags = extraction.tags;
        draft.confidence = extraction.confidence;
        draft.created_at = Utc::now();

        match self.drafts.create(&draft).await {
            Ok(created) => {
                info!(draft_id = %created.id, source_id = %item.source_id, "created pending draft");
                Ok(IngestOutcome::CreatedDraft(created))
            }
            Err(err) if is_unique_violation(&err) => {
                Ok(IngestOutcome::Dropped(DropReason::Duplicate))
            }
            Err(err) => Err(err),
        }
    }
}

/// Whether a storage error is the unique-index backstop firing for a
/// concurrent duplicate insert.
fn is_unique_violation(err: &AppError) -> bool {
    matches!(err, AppError::Db(msg) if msg.contains("UNIQUE constraint failed"))
}
