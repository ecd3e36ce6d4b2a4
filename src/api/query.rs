//! Conversational query endpoints

use super::error::ApiError;
use super::server::AppState;
use crate::services::{AskResult, PublicAnswer};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;

const PUBLIC_QUERY_EXAMPLE: &str = "/public/brain/query?q=what+are+my+notes+about+AI";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublicQueryParams {
    pub q: Option<String>,
}

/// POST /query
pub async fn query_brain(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AskResult>, ApiError> {
    let Json(req) = body?;
    let query = req.query.unwrap_or_default();

    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let result = state
        .brain
        .ask(&query)
        .await
        .map_err(|e| ApiError::from_brain(e, "Query failed"))?;

    Ok(Json(result))
}

/// GET /public/brain/query?q=...
pub async fn public_query(
    State(state): State<AppState>,
    Query(params): Query<PublicQueryParams>,
) -> Result<Json<PublicAnswer>, ApiError> {
    let query = params.q.unwrap_or_default();

    if query.trim().is_empty() {
        return Err(ApiError::BadRequestWithExample {
            error: "Query parameter \"q\" is required".to_string(),
            example: PUBLIC_QUERY_EXAMPLE.to_string(),
        });
    }

    let answer = state
        .brain
        .ask_public(&query)
        .await
        .map_err(|e| ApiError::from_brain(e, "Query failed"))?;

    Ok(Json(answer))
}
