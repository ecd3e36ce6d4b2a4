//! Knowledge item endpoints: list, create, get, patch, delete, tags

use super::error::ApiError;
use super::server::AppState;
use crate::services::CaptureRequest;
use crate::types::{
    normalize_tags, ItemFilter, ItemId, ItemType, ItemUpdate, KnowledgeItem, NewItem,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<KnowledgeItem>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: KnowledgeItem,
}

#[derive(Debug, Serialize)]
pub struct ItemMutationResponse {
    pub item: KnowledgeItem,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub source_url: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub auto_summarize: bool,
    #[serde(default)]
    pub auto_tag: bool,
}

/// Partial update; `null` for `sourceUrl` or `summary` clears the field
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchItemRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub source_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub summary: Option<Option<String>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent key (`None`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PatchItemRequest {
    fn into_update(self) -> Result<ItemUpdate, ApiError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ApiError::BadRequest("Title cannot be empty".to_string()));
            }
        }
        if let Some(content) = &self.content {
            if content.trim().is_empty() {
                return Err(ApiError::BadRequest("Content cannot be empty".to_string()));
            }
        }

        let item_type = self
            .item_type
            .as_deref()
            .map(ItemType::parse)
            .transpose()
            .map_err(|e| ApiError::from_brain(e, "Failed to update item"))?;

        Ok(ItemUpdate {
            title: self.title,
            content: self.content,
            item_type,
            source_url: self.source_url.map(blank_to_none),
            tags: self.tags.map(normalize_tags),
            summary: self.summary.map(blank_to_none),
        })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `type=all` or an empty value means no type filter
fn parse_type_filter(raw: Option<&str>) -> Result<Option<ItemType>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if t.eq_ignore_ascii_case("all") => Ok(None),
        Some(t) => ItemType::parse(t)
            .map(Some)
            .map_err(|e| ApiError::from_brain(e, "Failed to fetch items")),
    }
}

/// GET /items
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let filter = ItemFilter {
        item_type: parse_type_filter(params.item_type.as_deref())?,
        tag: params.tag.filter(|t| !t.trim().is_empty()),
        search: params.search.filter(|s| !s.is_empty()),
        limit: None,
    };

    let items = state
        .store
        .list_items(&filter)
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to fetch items"))?;

    debug!("Returning {} items", items.len());
    Ok(Json(ItemsResponse {
        count: items.len(),
        items,
    }))
}

/// POST /items/create
pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemMutationResponse>), ApiError> {
    let Json(req) = body?;

    let (title, content, raw_type) = match (req.title, req.content, req.item_type) {
        (Some(title), Some(content), Some(raw_type))
            if !title.trim().is_empty()
                && !content.trim().is_empty()
                && !raw_type.trim().is_empty() =>
        {
            (title, content, raw_type)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Title, content, and type are required".to_string(),
            ))
        }
    };

    let item_type =
        ItemType::parse(&raw_type).map_err(|e| ApiError::from_brain(e, "Failed to create item"))?;

    let mut item = NewItem::new(title, content, item_type).with_tags(req.tags.unwrap_or_default());
    item.source_url = blank_to_none(req.source_url);

    let created = state
        .brain
        .capture(CaptureRequest {
            item,
            auto_summarize: req.auto_summarize,
            auto_tag: req.auto_tag,
        })
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to create item"))?;

    info!("Captured {} item {}", created.item_type, created.id);
    Ok((
        StatusCode::CREATED,
        Json(ItemMutationResponse {
            item: created,
            success: true,
        }),
    ))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state
        .store
        .get_item(&ItemId::from(id))
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to fetch item"))?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    Ok(Json(ItemResponse { item }))
}

/// PATCH /items/:id
pub async fn patch_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PatchItemRequest>, JsonRejection>,
) -> Result<Json<ItemMutationResponse>, ApiError> {
    let Json(req) = body?;
    let update = req.into_update()?;

    let item = state
        .store
        .update_item(&ItemId::from(id), update)
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to update item"))?;

    info!("Updated item {}", item.id);
    Ok(Json(ItemMutationResponse {
        item,
        success: true,
    }))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = ItemId::from(id);
    let removed = state
        .store
        .delete_item(&id)
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to delete item"))?;

    if removed {
        info!("Deleted item {}", id);
    }
    Ok(Json(DeleteResponse {
        success: true,
        message: "Item deleted".to_string(),
    }))
}

/// GET /tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let tags = state
        .store
        .list_tags()
        .await
        .map_err(|e| ApiError::from_brain(e, "Failed to fetch tags"))?;

    Ok(Json(TagsResponse {
        count: tags.len(),
        tags,
    }))
}
