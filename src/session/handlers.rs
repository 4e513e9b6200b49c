use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    server::{app_state::AppState, error::ServerError},
    session::{error::SessionError, models::CreateSessionResponse},
};

pub fn session_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create/{quiz_id}", post(create_session))
        .route("/{code}", get(get_session))
        .with_state(state)
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let handle = state.get_sessions().create_session(quiz_id).await?;
    let overview = handle
        .snapshot()
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    let response = CreateSessionResponse {
        code: handle.code().to_string(),
        quiz_id,
        question_count: overview.question_count,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let handle = state
        .get_sessions()
        .get(&code)
        .ok_or_else(|| ServerError::NotFound(format!("session {}", code)))?;

    let overview = handle
        .snapshot()
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, Json(overview)))
}

impl From<SessionError> for ServerError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound(what) => ServerError::NotFound(what),
            SessionError::SessionNotFound => ServerError::NotFound("session".into()),
            SessionError::Storage(e) => e.into(),
            other => ServerError::Api(StatusCode::CONFLICT, other.to_string()),
        }
    }
}
