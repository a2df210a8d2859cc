//! Email connector: REST mailbox API polling.
//!
//! Talks to a JSON mailbox gateway (`GET /messages`) with the
//! integration's bearer token. Each thread is concatenated into a single
//! raw-text payload; the message id is the stable source id.

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

/// One message in a mailbox gateway response.
#[derive(Debug, Clone, Deserialize)]
pub struct MailMessage {
    /// Stable message identifier.
    pub id: String,
    /// Subject line.
    pub subject: String,
    /// Sender address.
    pub from: String,
    /// Plain-text body of the newest message.
    pub body: String,
    /// RFC 3339 rendering of the Date header.
    pub date: DateTime<Utc>,
    /// Plain-text bodies of earlier messages in the thread, oldest first.
    #[serde(default)]
    pub thread: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MailboxResponse {
    messages: Vec<MailMessage>,
}

/// Connector polling a REST mailbox gateway.
pub struct EmailConnector {
    client: reqwest::Client,
    api_base: String,
}

impl EmailConnector {
    /// Build a connector against the given mailbox gateway base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` if the HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| AppError::Source(format!("failed to build mail client: {err}")))?;
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
        let mut request = self
            .client
            .get(format!("{}/messages", self.api_base))
            .bearer_auth(&integration.credential)
            .query(&[("max", max.to_string())]);
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::Source(format!("mailbox fetch failed: {err}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(format!(
                "mailbox rejected credentials for integration {}",
                integration.id
            )));
        }
        if !status.is_success() {
            return Err(AppError::Source(format!("mailbox returned {status}")));
        }

        let parsed: MailboxResponse = response
            .json()
            .await
            .map_err(|err| AppError::Source(format!("invalid mailbox response: {err}")))?;

        debug!(
            integration_id = %integration.id,
            count = parsed.messages.len(),
            "fetched mailbox messages"
        );

        Ok(parsed
            .messages
            .into_iter()
            .map(|msg| message_to_item(&integration.user_id, msg))
            .collect())
    }
}

/// Normalize one mail message into an inbound item.
///
/// The raw text is the subject plus the whole thread so extraction sees
/// full context; the sender rides along as a context hint.
#[must_use]
pub fn message_to_item(user_id: &str, msg: MailMessage) -> InboundItem {
    let mut raw_text = format!("{}\n\n{}", msg.subject, msg.body);
    for earlier in &msg.thread {
        raw_text.push_str("\n\n");
        raw_text.push_str(earlier);
    }
    InboundItem {
        source_id: msg.id,
        raw_text,
        user_id: user_id.to_owned(),
        timestamp: msg.date,
        context_hints: Some(format!("email from {}", msg.from)),
    }
}

impl SourceConnector for EmailConnector {
    fn source(&self) -> Source {
        Source::Email
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
