//! Background pollers driving per-integration scans.
//!
//! One poller task per source type ticks on a fine-grained interval and
//! checks every enabled integration's own cadence against its
//! high-water mark, so the tick interval can be much finer than any
//! integration's effective frequency. Manual scan-now requests go
//! through [`Scanner::scan_now`], which shares the exact same
//! [`Scanner::scan_integration`] entry point as the pollers — no
//! separate code path, so dedup behavior can never diverge.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::ingest::{BatchReport, IngestPipeline};
use crate::models::integration::{Integration, IntegrationStatus};
use crate::persistence::integration_repo::IntegrationRepo;
use crate::sources::SourceConnector;
use crate::{AppError, Result};

/// Shared scan orchestration over all registered connectors.
pub struct Scanner {
    connectors: Vec<Arc<dyn SourceConnector>>,
    pipeline: Arc<IngestPipeline>,
    integrations: IntegrationRepo,
    batch_max: usize,
}

impl Scanner {
    /// Assemble a scanner over the registered connectors.
    #[must_use]
    pub fn new(
        connectors: Vec<Arc<dyn SourceConnector>>,
        pipeline: Arc<IngestPipeline>,
        integrations: IntegrationRepo,
        batch_max: usize,
    ) -> Self {
        Self {
            connectors,
            pipeline,
            integrations,
            batch_max,
        }
    }

    /// Run one scan for a single integration: fetch, ingest, advance
    /// the high-water mark.
    ///
    /// The watermark is captured at scan start and written only after
    /// the whole batch completes (success or partial failure), never
    /// mid-batch and never rolled back — a failed scan simply re-covers
    /// the same window next time, which the dedup invariant makes safe.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` after parking the integration in
    /// `auth_error` state, or `AppError::Source` on fetch failure. Batch
    /// item errors do not fail the scan; they are in the report.
    pub async fn scan_integration(
        &self,
        connector: &Arc<dyn SourceConnector>,
        integration: &Integration,
    ) -> Result<BatchReport> {
        let scan_started = Utc::now();

        let items = match connector
            .fetch_since(integration, integration.last_scan_at, self.batch_max)
            .await
        {
            Ok(items) => items,
            Err(AppError::Unauthorized(msg)) => {
                warn!(
                    integration_id = %integration.id,
                    "credentials rejected, parking integration"
                );
                self.integrations
                    .set_status(&integration.id, IntegrationStatus::AuthError)
                    .await?;
                return Err(AppError::Unauthorized(msg));
            }
            Err(err) => return Err(err),
        };

        let report = self
            .pipeline
            .process_batch(
                &items,
                integration.source,
                &integration.filter_rules,
                self.batch_max,
            )
            .await;

        self.integrations
            .advance_watermark(&integration.id, scan_started)
            .await?;

        Ok(report)
    }

    /// Run an on-demand scan for one integration, bypassing the cadence
    /// check but nothing else.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown integration id and
    /// any error from [`Self::scan_integration`].
    pub async fn scan_now(&self, integration_id: &str) -> Result<BatchReport> {
        let integration = self
            .integrations
            .get_by_id(integration_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("integration {integration_id} not found"))
            })?;

        let connector = self
            .connector_for(&integration)
            .ok_or_else(|| {
                AppError::Source(format!(
                    "no connector registered for integration {integration_id}"
                ))
            })?
            .clone();

        self.scan_integration(&connector, &integration).await
    }

    /// One poller tick for a single source: scan every enabled
    /// integration that is due.
    ///
    /// Integration-level failures are logged and skipped; the tick
    /// always visits every integration.
    async fn tick(&self, connector: &Arc<dyn SourceConnector>) {
        let integrations = match self
            .integrations
            .list_enabled_for_source(connector.source())
            .await
        {
            Ok(list) => list,
            Err(err) => {
                error!(?err, "failed to list integrations for tick");
                return;
            }
        };

        let now = Utc::now();
        for integration in &integrations {
            if !integration.is_due(now) {
                continue;
            }
            match self.scan_integration(connector, integration).await {
                Ok(report) => {
                    info!(
                        integration_id = %integration.id,
                        created_tasks = report.created_tasks,
                        created_drafts = report.created_drafts,
                        duplicates = report.duplicates,
                        "scan complete"
                    );
                }
                Err(err) => {
                    // Watermark untouched — the window is rescanned on
                    // the next due tick.
                    warn!(integration_id = %integration.id, %err, "scan failed");
                }
            }
        }
    }

    fn connector_for(&self, integration: &Integration) -> Option<&Arc<dyn SourceConnector>> {
        self.connectors
            .iter()
            .find(|c| c.source() == integration.source)
    }
}

/// Spawn one poller task per registered connector.
///
/// Pollers share no mutable in-process state beyond the persistent
/// store, so concurrent pollers processing the same user are safe: the
/// dedup key is scoped by source.
#[must_use]
pub fn spawn_pollers(
    scanner: &Arc<Scanner>,
    tick_interval: Duration,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    scanner
        .connectors
        .iter()
        .map(|connector| {
            let scanner = Arc::clone(scanner);
            let connector = Arc::clone(connector);
            let cancel = cancel.clone();
            let source = connector.source();
            tokio::spawn(
                async move {
                    let mut interval = tokio::time::interval(tick_interval);
                    loop {
                        tokio::select! {
                            () = cancel.cancelled() => {
                                info!(?source, "poller shutting down");
                                break;
                            }
                            _ = interval.tick() => {
                                scanner.tick(&connector).await;
                            }
                        }
                    }
                }
                .instrument(info_span!("source_poller", ?source)),
            )
        })
        .collect()
}
