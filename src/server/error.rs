use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Api error: {0} - {1}")]
    Api(StatusCode, String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to serialize object: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for ServerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => ServerError::NotFound(what),
            StoreError::Database(e) => ServerError::Database(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::Api(status, message) => (status, message),
            ServerError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            ServerError::Internal(message) => {
                error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
            ServerError::Database(e) => {
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".into())
            }
            ServerError::Serialize(e) => {
                error!("Serialization error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid payload".into())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
