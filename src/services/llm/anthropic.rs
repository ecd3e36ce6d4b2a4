//! Anthropic Messages API transport

use super::{check_status, CompletionTransport, ProviderConfig, TransportError};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
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

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic REST client
pub struct AnthropicTransport {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl AnthropicTransport {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CompletionTransport for AnthropicTransport {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn has_credentials(&self) -> bool {
        self.config
            .api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    async fn send(&self, prompt: &str) -> Result<String, TransportError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| TransportError::Request("ANTHROPIC_API_KEY not set".to_string()))?;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.config.model, "Calling Anthropic messages API");

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url()))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        let response = check_status(response).await?;
        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.without_url().to_string()))?;

        Ok(body
            .content
            .into_iter()
            .find_map(|block| block.text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default())
    }
}
