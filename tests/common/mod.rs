//! Common test utilities and helpers
#![allow(dead_code)]

use axum::Router;
use second_brain::services::llm::{LlmHttpConfig, ProviderConfig, ProviderKind};
use second_brain::{
    AiGateway, ApiServer, AppState, BrainService, ConnectionMode, KnowledgeStore, LibsqlStore,
    RetryPolicy,
};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PUBLIC_BASE_URL: &str = "https://brain.test";

/// Create a schema-initialized LibSQL store in a temp directory
///
/// libSQL's `:memory:` databases are per connection, and the store opens a
/// connection per operation, so tests use a file. Keep the `TempDir` alive
/// for the duration of the test.
pub async fn create_test_store() -> (LibsqlStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("brain.db");
    let store = LibsqlStore::open_initialized(ConnectionMode::Local(
        path.to_string_lossy().into_owned(),
    ))
    .await
    .expect("Failed to create test store");
    (store, dir)
}

/// Gemini gateway pointed at a mock server, with millisecond backoff
pub fn mock_gateway(endpoint: &str, max_retries: u32) -> AiGateway {
    let mut config = ProviderConfig::for_provider(
        ProviderKind::Gemini,
        Some(SecretString::new("test-key".into())),
    );
    config.endpoint = endpoint.to_string();

    AiGateway::for_provider(
        ProviderKind::Gemini,
        config,
        LlmHttpConfig::default(),
        RetryPolicy::new(max_retries, Duration::from_millis(1)),
    )
}

/// Gateway without an API key; every model call fails before the network
pub fn unconfigured_gateway() -> AiGateway {
    let mut config = ProviderConfig::for_provider(ProviderKind::Gemini, None);
    config.endpoint = "http://127.0.0.1:9".to_string();

    AiGateway::for_provider(
        ProviderKind::Gemini,
        config,
        LlmHttpConfig::default(),
        RetryPolicy::new(0, Duration::from_millis(1)),
    )
}

/// Full router over a fresh store
pub async fn test_app(gateway: AiGateway) -> (Router, Arc<LibsqlStore>, TempDir) {
    let (store, dir) = create_test_store().await;
    let store = Arc::new(store);
    let brain = BrainService::new(
        store.clone() as Arc<dyn KnowledgeStore>,
        gateway,
        PUBLIC_BASE_URL,
    );
    let router = ApiServer::build_router(AppState::new(brain));
    (router, store, dir)
}

/// Gemini `generateContent` reply body carrying `text`
pub fn gemini_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    })
}
