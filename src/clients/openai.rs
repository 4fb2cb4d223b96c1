//! OpenAI chat-completions wrapper used to write profile reviews.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use serde_json::json;

use super::{UpstreamError, status_error};
use crate::config::OpenAiConfig;

const PROVIDER: &str = "openai";

/// Produces review text from a prompt.
#[async_trait]
pub trait ReviewGenerator: Send + Sync {
    /// Identifier of the model that writes the text, stored with the review.
    fn model(&self) -> &str;

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// reqwest-backed [`ReviewGenerator`] for the chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(http: reqwest::Client, config: &OpenAiConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            http,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.api_base.trim_end_matches('/')
            ),
            api_key,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl ReviewGenerator for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, UpstreamError> {
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            UpstreamError::Decode {
                provider: PROVIDER,
                message: format!("invalid auth header: {e}"),
            }
        })?;

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, auth)
            .timeout(self.timeout)
            .json(&json!({
                "model": self.model,
                "temperature": 0.7,
                "max_tokens": 700,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": prompt }
                ]
            }))
            .send()
            .await
            .map_err(UpstreamError::network(PROVIDER))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let completion = response
            .json::<ChatCompletion>()
            .await
            .map_err(UpstreamError::decode(PROVIDER))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(UpstreamError::Decode {
                provider: PROVIDER,
                message: "response missing choices[0].message.content".to_string(),
            })
    }
}
