//! Anthropic Messages API text generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::errors::AnthropicError;
use super::retry::RetryPolicy;
use crate::domain::errors::DomainResult;
use crate::domain::models::GenerationConfig;
use crate::domain::ports::TextGenerator;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Text generator backed by the Anthropic Messages API.
///
/// Transient failures (429, 5xx, network) are retried with exponential
/// backoff before an error is reported.
pub struct AnthropicTextGenerator {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    retry_policy: RetryPolicy,
}

impl AnthropicTextGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, AnthropicError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("anthropic-version", header::HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff_ms,
                config.max_backoff_ms,
            ),
        })
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, max_tokens = self.max_tokens))]
    pub async fn complete(&self, prompt: &str) -> Result<String, AnthropicError> {
        let api_key = self.api_key.as_deref().ok_or(AnthropicError::MissingApiKey)?;

        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .retry_policy
            .execute(|| self.send(api_key, &request))
            .await?;

        debug!(
            input_tokens = response.usage.as_ref().map_or(0, |u| u.input_tokens),
            output_tokens = response.usage.as_ref().map_or(0, |u| u.output_tokens),
            "message request succeeded"
        );

        let text = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(AnthropicError::EmptyResponse);
        }
        Ok(text)
    }

    async fn send(&self, api_key: &str, request: &MessageRequest<'_>) -> Result<MessageResponse, AnthropicError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(AnthropicError::from_status(status, body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TextGenerator for AnthropicTextGenerator {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn generate(&self, prompt: &str) -> DomainResult<String> {
        Ok(self.complete(prompt).await?)
    }
}

// -- Messages API request/response types --

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
