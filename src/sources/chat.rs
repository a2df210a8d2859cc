//! Chat-mention connector: Slack channel history polling.
//!
//! Reads recent channel history via `slack-morphism` and captures
//! messages that mention the bot user. The Slack message timestamp is
//! the stable source id.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use slack_morphism::prelude::{
    SlackApiConversationsHistoryRequest, SlackApiToken, SlackApiTokenType, SlackApiTokenValue,
    SlackChannelId, SlackClient, SlackClientHyperHttpsConnector, SlackHistoryMessage, SlackTs,
};
use tracing::debug;

use crate::ingest::InboundItem;
use crate::models::draft::Source;
use crate::models::integration::Integration;
use crate::{AppError, Result};

use super::SourceConnector;

/// Per-integration credential payload for the chat connector.
#[derive(Debug, Deserialize)]
struct ChatCredential {
    /// Bot token authorized to read the channel.
    token: String,
    /// Channel to scan for mentions.
    channel: String,
}

/// Connector polling Slack channel history for bot mentions.
pub struct ChatConnector {
    client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    bot_user_id: String,
}

impl ChatConnector {
    /// Build a connector watching mentions of `bot_user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` if the HTTPS connector cannot be created.
    pub fn new(bot_user_id: impl Into<String>) -> Result<Self> {
        let connector = SlackClientHyperHttpsConnector::new()
            .map_err(|err| AppError::Source(format!("failed to init slack connector: {err}")))?;
        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_user_id: bot_user_id.into(),
        })
    }

    async fn fetch(
        &self,
        integration: &Integration,
        since: Option<DateTime<Utc>>,
        max: usize,
    ) -> Result<Vec<InboundItem>> {
        let credential: ChatCredential =
            serde_json::from_str(&integration.credential).map_err(|err| {
                AppError::Unauthorized(format!(
                    "chat credential for integration {} is malformed: {err}",
                    integration.id
                ))
            })?;

        let token = SlackApiToken {
            token_value: SlackApiTokenValue(credential.token),
            cookie: None,
            team_id: None,
            scope: None,
            token_type: Some(SlackApiTokenType::Bot),
        };
        let session = self.client.open_session(&token);

        let limit = u16::try_from(max.min(200)).unwrap_or(200);
        let request = SlackApiConversationsHistoryRequest {
            channel: Some(SlackChannelId(credential.channel)),
            cursor: None,
            latest: None,
            limit: Some(limit),
            oldest: since.map(|dt| SlackTs(to_slack_ts(dt))),
            inclusive: None,
            include_all_metadata: None,
        };

        let messages = session
            .conversations_history(&request)
            .await
            .map(|response| response.messages)
            .map_err(|err| classify_slack_error(&integration.id, &err.to_string()))?;

        debug!(
            integration_id = %integration.id,
            count = messages.len(),
            "fetched chat history"
        );

        Ok(messages
            .into_iter()
            .filter_map(|msg| mention_to_item(&integration.user_id, &self.bot_user_id, &msg))
            .collect())
    }
}

/// Map a Slack API failure onto the integration error taxonomy.
fn classify_slack_error(integration_id: &str, rendered: &str) -> AppError {
    if rendered.contains("invalid_auth") || rendered.contains("not_authed") {
        AppError::Unauthorized(format!(
            "slack rejected credentials for integration {integration_id}"
        ))
    } else {
        AppError::Source(format!("slack history fetch failed: {rendered}"))
    }
}

/// Render a timestamp in Slack's `seconds.micros` ts format.
fn to_slack_ts(dt: DateTime<Utc>) -> String {
    format!("{}.000000", dt.timestamp())
}

/// Parse a Slack ts (`"1712345678.123456"`) into a UTC timestamp.
#[must_use]
pub fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = ts.split('.').next()?.parse().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Normalize one history message into an inbound item, if it mentions
/// the bot. The mention markup itself is stripped from the payload.
fn mention_to_item(
    user_id: &str,
    bot_user_id: &str,
    msg: &SlackHistoryMessage,
) -> Option<InboundItem> {
    let text = msg.content.text.as_deref()?;
    let mention = format!("<@{bot_user_id}>");
    if !text.contains(&mention) {
        return None;
    }

    let ts = msg.origin.ts.to_string();
    let timestamp = parse_slack_ts(&ts)?;
    let raw_text = text.replace(&mention, "").trim().to_owned();
    if raw_text.is_empty() {
        return None;
    }

    Some(InboundItem {
        source_id: ts,
        raw_text,
        user_id: user_id.to_owned(),
        timestamp,
        context_hints: Some("chat mention".to_owned()),
    })
}

impl SourceConnector for ChatConnector {
    fn source(&self) -> Source {
        Source::ChatMention
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
