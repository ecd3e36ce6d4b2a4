//! Capture and recall orchestration
//!
//! Sits between the HTTP layer and the two backends: augments new items with
//! AI summaries and tags, and runs the retrieve-then-generate query pipeline
//! for both the private and the public query endpoints.

use crate::error::{BrainError, Result};
use crate::services::llm::{AiGateway, CitedItem};
use crate::storage::KnowledgeStore;
use crate::types::{ItemFilter, ItemId, KnowledgeItem, NewItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Most recent items handed to the model for a query
pub const QUERY_WINDOW: usize = 20;

/// Public answer when there is nothing stored
pub const EMPTY_KNOWLEDGE_BASE_ANSWER: &str = "The knowledge base is empty. No items found.";

/// A new item plus the augmentation the caller asked for
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub item: NewItem,
    pub auto_summarize: bool,
    pub auto_tag: bool,
}

/// Result of a private query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResult {
    pub answer: String,
    pub relevant_items: Vec<CitedItem>,
    pub total_items_searched: usize,
}

/// A cited item with a link back to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSource {
    pub id: ItemId,
    pub title: String,
    pub excerpt: String,
    pub url: String,
}

/// Result of a public query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAnswer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<PublicSource>,
    pub item_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Orchestrates storage and the AI gateway
#[derive(Clone)]
pub struct BrainService {
    store: Arc<dyn KnowledgeStore>,
    gateway: AiGateway,
    public_base_url: String,
}

impl BrainService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        gateway: AiGateway,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    /// Create an item, asking the model for a summary and tags when requested
    ///
    /// Augmentation failures are logged; the item is stored regardless.
    pub async fn capture(&self, request: CaptureRequest) -> Result<KnowledgeItem> {
        let CaptureRequest {
            mut item,
            auto_summarize,
            auto_tag,
        } = request;

        if item.title.trim().is_empty() || item.content.trim().is_empty() {
            return Err(BrainError::Validation(
                "Title, content, and type are required".to_string(),
            ));
        }

        if auto_summarize {
            match self.gateway.summarize(&item.content).await {
                Ok(summary) if !summary.is_empty() => item.summary = Some(summary),
                Ok(_) => debug!("Model returned an empty summary"),
                Err(e) => warn!("Auto-summarize failed, storing item without summary: {}", e),
            }
        }

        if auto_tag && item.tags.is_empty() {
            match self.gateway.tag(&item.title, &item.content).await {
                Ok(tags) => item.tags = tags,
                Err(e) => warn!("Auto-tag failed, storing item without tags: {}", e),
            }
        }

        self.store.create_item(item).await
    }

    /// Answer a question from the most recent items
    pub async fn ask(&self, query: &str) -> Result<AskResult> {
        let query = require_query(query)?;

        let items = self.recent_items().await?;
        let answer = self.gateway.answer(query, &items).await?;

        info!(
            searched = items.len(),
            cited = answer.relevant_items.len(),
            "Answered query"
        );

        Ok(AskResult {
            answer: answer.answer,
            relevant_items: answer.relevant_items,
            total_items_searched: items.len(),
        })
    }

    /// Answer for the public endpoint, with linkable sources
    pub async fn ask_public(&self, query: &str) -> Result<PublicAnswer> {
        let query = require_query(query)?;

        let items = self.recent_items().await?;
        if items.is_empty() {
            return Ok(PublicAnswer {
                query: query.to_string(),
                answer: EMPTY_KNOWLEDGE_BASE_ANSWER.to_string(),
                sources: Vec::new(),
                item_count: 0,
                timestamp: Utc::now(),
            });
        }

        let answer = self.gateway.answer(query, &items).await?;
        let item_count = self.store.count_items().await?;

        let sources = answer
            .relevant_items
            .into_iter()
            .map(|cited| PublicSource {
                url: self.item_url(&cited.id),
                id: cited.id,
                title: cited.title,
                excerpt: cited.excerpt,
            })
            .collect();

        Ok(PublicAnswer {
            query: query.to_string(),
            answer: answer.answer,
            sources,
            item_count,
            timestamp: Utc::now(),
        })
    }

    /// Absolute link to an item on the public site
    pub fn item_url(&self, id: &ItemId) -> String {
        format!("{}/items/{}", self.public_base_url, id)
    }

    async fn recent_items(&self) -> Result<Vec<KnowledgeItem>> {
        self.store.list_items(&ItemFilter::recent(QUERY_WINDOW)).await
    }
}

fn require_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(BrainError::Validation("Query is required".to_string()));
    }
    Ok(trimmed)
}
