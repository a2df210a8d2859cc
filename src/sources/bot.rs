//! Bot-command connector: long-poll update API.
//!
//! Polls a Telegram-style `getUpdates` endpoint with the integration's
//! bot token. The monotonically increasing update id is the stable
//! source id, so the same update can be fetched across overlapping
//! windows without producing a second artifact.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::ingest::InboundItem;
use crate::models::draft::Source;
use crate::models::integration::Integration;
use crate::{AppError, Result};

use super::SourceConnector;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// One update in a bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUpdate {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// Message payload, absent for non-message updates.
    pub message: Option<BotMessage>,
}

/// Message payload inside a bot update.
#[derive(Debug, Clone, Deserialize)]
pub struct BotMessage {
    /// Message text.
    pub text: Option<String>,
    /// Unix timestamp of the message.
    pub date: i64,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<BotUpdate>,
    #[serde(default)]
    description: Option<String>,
}

/// Connector polling a bot update API.
pub struct BotConnector {
    client: reqwest::Client,
    api_base: String,
}

impl BotConnector {
    /// Build a connector against the given bot API base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` if the HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| AppError::Source(format!("failed to build bot client: {err}")))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
        })
    }

    async fn fetch(
        &self,
        integration: &Integration,
        since: Option<DateTime<Utc>>,
        max: usize,
    ) -> Result<Vec<InboundItem>> {
        let response = self
            .client
            .get(format!(
                "{}/bot{}/getUpdates",
                self.api_base, integration.credential
            ))
            .query(&[("limit", max.to_string())])
            .send()
            .await
            .map_err(|err| AppError::Source(format!("bot fetch failed: {err}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(format!(
                "bot api rejected credentials for integration {}",
                integration.id
            )));
        }
        if !status.is_success() {
            return Err(AppError::Source(format!("bot api returned {status}")));
        }

        let parsed: UpdatesResponse = response
            .json()
            .await
            .map_err(|err| AppError::Source(format!("invalid bot response: {err}")))?;
        if !parsed.ok {
            return Err(AppError::Source(format!(
                "bot api error: {}",
                parsed.description.unwrap_or_else(|| "unknown".into())
            )));
        }

        debug!(
            integration_id = %integration.id,
            count = parsed.result.len(),
            "fetched bot updates"
        );

        Ok(parsed
            .result
            .into_iter()
            .filter_map(|update| update_to_item(&integration.user_id, update, since))
            .collect())
    }
}

/// Normalize one bot update into an inbound item.
///
/// Non-message updates, empty texts, and updates at or before `since`
/// are skipped.
#[must_use]
pub fn update_to_item(
    user_id: &str,
    update: BotUpdate,
    since: Option<DateTime<Utc>>,
) -> Option<InboundItem> {
    let message = update.message?;
    let text = message.text?.trim().to_owned();
    if text.is_empty() {
        return None;
    }
    let timestamp = DateTime::from_timestamp(message.date, 0)?;
    if let Some(since) = since {
        if timestamp <= since {
            return None;
        }
    }

    Some(InboundItem {
        source_id: update.update_id.to_string(),
        raw_text: text,
        user_id: user_id.to_owned(),
        timestamp,
        context_hints: Some("bot command".to_owned()),
    })
}

impl SourceConnector for BotConnector {
    fn source(&self) -> Source {
        Source::BotMessage
    }

    fn fetch_since<'a>(
        &'a self,
        integration: &'a Integration,
        since: Option<DateTime<Utc>>,
        max: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<InboundItem>>> + Send + 'a>> {
        Box::pin(self.fetch(integration, since, max))
    }
}
