//! AI gateway for knowledge augmentation and recall
//!
//! Wraps a hosted generative-text API behind three intents:
//! - Summarizing captured content
//! - Suggesting tags for an item
//! - Answering a question from a set of stored items
//!
//! The HTTP details of each provider live behind [`CompletionTransport`];
//! rate-limit retries are handled here for every intent.

mod anthropic;
mod gemini;
pub mod prompts;
mod retry;

pub use anthropic::AnthropicTransport;
pub use gemini::GeminiTransport;
pub use retry::{send_with_backoff, RetryPolicy};

use crate::config::AiSettings;
use crate::error::{BrainError, Result};
use crate::types::{normalize_tags, ItemId, KnowledgeItem};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on tags kept from a model reply
pub const MAX_GENERATED_TAGS: usize = 5;

/// Hosted model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(BrainError::Other(format!(
                "Unknown AI provider '{}'. Expected gemini or anthropic",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Anthropic => "claude-3-5-haiku-20241022",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Request settings shared by every transport
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl ProviderConfig {
    /// Defaults for a provider with the given key
    pub fn for_provider(kind: ProviderKind, api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            model: kind.default_model().to_string(),
            endpoint: kind.default_endpoint().to_string(),
            temperature: 0.7,
            max_output_tokens: 500,
        }
    }

    /// Endpoint without a trailing slash
    fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

/// HTTP client timeouts for provider calls
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable)
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable)
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Build an HTTP client with the configured timeouts
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        warn!("Failed to build LLM HTTP client: {err}");
        reqwest::Client::new()
    })
}

/// Outcome of a single provider call that did not produce text
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP 429
    #[error("rate limited")]
    RateLimited,

    /// Any other non-2xx response
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connect, timeout or other transport failure
    #[error("request failed: {0}")]
    Request(String),

    /// 2xx response with an unreadable body
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<TransportError> for BrainError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RateLimited => BrainError::RateLimited { retries: 0 },
            other => BrainError::Provider(other.to_string()),
        }
    }
}

/// Map a raw response to success or a classified failure
async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(TransportError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// One round trip to a hosted model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Whether an API key is available
    fn has_credentials(&self) -> bool;

    /// Send one prompt and return the reply text
    async fn send(&self, prompt: &str) -> std::result::Result<String, TransportError>;
}

/// Item cited alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedItem {
    pub id: ItemId,
    pub title: String,
    pub excerpt: String,
}

impl CitedItem {
    pub fn from_item(item: &KnowledgeItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            excerpt: prompts::excerpt(item),
        }
    }
}

/// Answer text plus the items it drew on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub answer: String,
    pub relevant_items: Vec<CitedItem>,
}

/// Turn a comma-separated model reply into at most five clean tags
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags = normalize_tags(raw.split(','));
    tags.truncate(MAX_GENERATED_TAGS);
    tags
}

/// Gateway to the hosted model
#[derive(Clone)]
pub struct AiGateway {
    transport: Arc<dyn CompletionTransport>,
    retry: RetryPolicy,
}

impl AiGateway {
    pub fn new(transport: Arc<dyn CompletionTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Build the transport selected by `kind` with a fresh HTTP client
    pub fn for_provider(
        kind: ProviderKind,
        config: ProviderConfig,
        http: LlmHttpConfig,
        retry: RetryPolicy,
    ) -> Self {
        let client = build_http_client(http);
        let transport: Arc<dyn CompletionTransport> = match kind {
            ProviderKind::Gemini => Arc::new(GeminiTransport::new(client, config)),
            ProviderKind::Anthropic => Arc::new(AnthropicTransport::new(client, config)),
        };

        info!(
            provider = kind.as_str(),
            configured = transport.has_credentials(),
            "AI gateway ready"
        );
        Self::new(transport, retry)
    }

    pub fn from_settings(settings: &AiSettings) -> Self {
        Self::for_provider(
            settings.provider,
            settings.provider_config(),
            settings.http_config(),
            settings.retry_policy(),
        )
    }

    pub fn provider(&self) -> &'static str {
        self.transport.name()
    }

    pub fn is_configured(&self) -> bool {
        self.transport.has_credentials()
    }

    /// Summarize content in under 100 words
    pub async fn summarize(&self, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(BrainError::Validation(
                "Content is required for summarization".to_string(),
            ));
        }

        debug!("Requesting summary for {} chars", content.len());
        self.complete(&prompts::summarize_prompt(content)).await
    }

    /// Suggest up to five tags for an item
    pub async fn tag(&self, title: &str, content: &str) -> Result<Vec<String>> {
        if content.trim().is_empty() {
            return Err(BrainError::Validation(
                "Content is required for tagging".to_string(),
            ));
        }

        let reply = self.complete(&prompts::tag_prompt(title, content)).await?;
        let tags = parse_tags(&reply);
        debug!("Generated tags: {:?}", tags);
        Ok(tags)
    }

    /// Answer a question from the supplied items, citing the first few
    pub async fn answer(&self, query: &str, items: &[KnowledgeItem]) -> Result<QueryAnswer> {
        if query.trim().is_empty() {
            return Err(BrainError::Validation("Query is required".to_string()));
        }

        if items.is_empty() {
            return Ok(QueryAnswer {
                answer: prompts::EMPTY_BRAIN_ANSWER.to_string(),
                relevant_items: Vec::new(),
            });
        }

        let prompt = prompts::answer_prompt(query, items);
        let answer = self.complete(&prompt).await?;

        let relevant_items = items
            .iter()
            .take(prompts::MAX_CITED_ITEMS)
            .map(CitedItem::from_item)
            .collect();

        Ok(QueryAnswer {
            answer,
            relevant_items,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if !self.transport.has_credentials() {
            return Err(BrainError::MissingCredentials(format!(
                "no API key for {}",
                self.transport.name()
            )));
        }

        send_with_backoff(self.transport.as_ref(), prompt, &self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;
    use chrono::Utc;
    use proptest::prelude::*;

    fn gateway(mock: MockCompletionTransport) -> AiGateway {
        AiGateway::new(Arc::new(mock), RetryPolicy::new(5, Duration::from_millis(1)))
    }

    fn configured_mock() -> MockCompletionTransport {
        let mut mock = MockCompletionTransport::new();
        mock.expect_name().return_const("mock");
        mock.expect_has_credentials().return_const(true);
        mock
    }

    fn item(title: &str) -> KnowledgeItem {
        let now = Utc::now();
        KnowledgeItem {
            id: ItemId::new(),
            title: title.to_string(),
            content: format!("{} content", title),
            item_type: ItemType::Note,
            source_url: None,
            tags: vec![],
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_tags_cleans_and_caps() {
        let tags = parse_tags("Rust, Async Programming, tokio!, rust, , web-dev, systems, extra");
        assert_eq!(
            tags,
            vec!["rust", "asyncprogramming", "tokio", "web-dev", "systems"]
        );
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("Gemini").unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::parse("anthropic").unwrap(), ProviderKind::Anthropic);
        assert!(ProviderKind::parse("openai").is_err());
    }

    #[tokio::test]
    async fn test_summarize_rejects_blank_content() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_send().never();
        let err = gateway(mock).summarize("   ").await.unwrap_err();
        assert!(matches!(err, BrainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_skips_network() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_name().return_const("mock");
        mock.expect_has_credentials().return_const(false);
        mock.expect_send().never();

        let err = gateway(mock).summarize("some content").await.unwrap_err();
        assert!(matches!(err, BrainError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_summarize_sends_prompt() {
        let mut mock = configured_mock();
        mock.expect_send()
            .withf(|prompt: &str| prompt.starts_with("Summarize the following content"))
            .times(1)
            .returning(|_| Ok("A summary".to_string()));

        let summary = gateway(mock).summarize("Long text").await.unwrap();
        assert_eq!(summary, "A summary");
    }

    #[tokio::test]
    async fn test_tag_post_processes_reply() {
        let mut mock = configured_mock();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok("Machine Learning, AI, ai, data_science".to_string()));

        let tags = gateway(mock).tag("ML", "Neural nets").await.unwrap();
        assert_eq!(tags, vec!["machinelearning", "ai", "datascience"]);
    }

    #[tokio::test]
    async fn test_answer_on_empty_items_is_canned() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_has_credentials().never();
        mock.expect_send().never();

        let answer = gateway(mock).answer("anything?", &[]).await.unwrap();
        assert_eq!(answer.answer, prompts::EMPTY_BRAIN_ANSWER);
        assert!(answer.relevant_items.is_empty());
    }

    #[tokio::test]
    async fn test_answer_rejects_blank_query() {
        let mock = MockCompletionTransport::new();
        let err = gateway(mock).answer(" ", &[item("a")]).await.unwrap_err();
        assert!(matches!(err, BrainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_answer_cites_first_three_items() {
        let mut mock = configured_mock();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok("See [1] and [2].".to_string()));

        let items: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|t| item(t)).collect();
        let answer = gateway(mock).answer("question", &items).await.unwrap();

        assert_eq!(answer.answer, "See [1] and [2].");
        let titles: Vec<_> = answer.relevant_items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(answer.relevant_items[0].excerpt, "a content...");
    }

    proptest! {
        #[test]
        fn prop_parsed_tags_are_clean(raw in ".{0,200}") {
            let tags = parse_tags(&raw);
            prop_assert!(tags.len() <= MAX_GENERATED_TAGS);
            for tag in &tags {
                prop_assert!(!tag.is_empty());
                prop_assert!(tag
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            }
        }

        #[test]
        fn prop_parsed_tags_have_no_duplicates(
            parts in proptest::collection::vec("[A-Za-z0-9 _-]{0,12}", 0..12)
        ) {
            let tags = parse_tags(&parts.join(","));
            let mut seen = std::collections::HashSet::new();
            for tag in &tags {
                prop_assert!(seen.insert(tag.clone()));
            }
        }
    }
}
