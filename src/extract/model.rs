//! HTTP completion backend for OpenAI-compatible chat endpoints.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::ModelConfig;
use crate::{AppError, Result};

use super::CompletionBackend;

/// Completion backend that posts JSON chat requests via `reqwest`.
pub struct HttpCompletionBackend {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpCompletionBackend {
    /// Build a backend from the model configuration.
    ///
    /// The request timeout bounds every completion call so one slow
    /// model response cannot wedge a poller tick.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Extraction` if the HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| AppError::Extraction(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post_completion(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Extraction(format!("completion request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Extraction(format!(
                "completion request returned {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| AppError::Extraction(format!("invalid completion response: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Extraction("completion response had no choices".into()))
    }
}

impl CompletionBackend for HttpCompletionBackend {
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let system = system.to_owned();
        let user = user.to_owned();
        Box::pin(async move { self.post_completion(&system, &user).await })
    }
}
