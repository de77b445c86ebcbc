use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use crate::error::ContentError;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Game not found: {0}")]
    GameNotFound(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<ContentError> for WebError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(game_id) => WebError::GameNotFound(game_id),
            ContentError::InvalidGameId(game_id) => {
                WebError::BadRequest(format!("Invalid game identifier: {}", game_id))
            }
            other => WebError::InternalServerError(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebError::GameNotFound(id) => (StatusCode::NOT_FOUND, format!("Game {} not found", id)),
            WebError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T, E = WebError> = std::result::Result<T, E>;
