//! HTTP error responses
//!
//! Every failure leaves the API as `{"error": "..."}` with a matching status.

use crate::error::BrainError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// 400 with a message
    BadRequest(String),
    /// 400 with a usage hint
    BadRequestWithExample { error: String, example: String },
    /// 404
    NotFound(String),
    /// 500 whose message is safe to show
    Upstream(String),
    /// 500 with a generic message; details only go to the log
    Internal(String),
}

impl ApiError {
    /// Classify a service error; `context` names the failed operation
    ///
    /// Provider failures keep their message, prefixed by `context`.
    /// Storage and other local failures are logged and reported as `context`.
    pub fn from_brain(err: BrainError, context: &str) -> Self {
        match err {
            BrainError::Validation(msg) => ApiError::BadRequest(msg),
            BrainError::NotFound(_) => ApiError::NotFound("Item not found".to_string()),
            err if err.is_upstream() => {
                error!(error = %err, "{}", context);
                ApiError::Upstream(format!("{}: {}", context, err))
            }
            err => {
                error!(error = %err, "{}", context);
                ApiError::Internal(context.to_string())
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::BadRequestWithExample { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequestWithExample { error, example } => {
                json!({ "error": error, "example": example })
            }
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Upstream(msg)
            | ApiError::Internal(msg) => json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = ApiError::from_brain(BrainError::Validation("bad".into()), "Failed");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from_brain(BrainError::NotFound("x".into()), "Failed");
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Item not found"));

        let err = ApiError::from_brain(BrainError::RateLimited { retries: 5 }, "Query failed");
        match err {
            ApiError::Upstream(msg) => {
                assert!(msg.starts_with("Query failed: "));
                assert!(msg.contains("rate limit"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = ApiError::from_brain(
            BrainError::Database("disk I/O error at /var/lib/brain.db".into()),
            "Failed to fetch items",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::Internal(ref m) if m == "Failed to fetch items"));
    }
}
