use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use ideaboard_shared::ValidationError;
use ideaboard_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();

        let status = match &self {
            ServerError::Store(err) => match err {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::InvalidState { .. } | StoreError::InvalidTarget(_) => {
                    StatusCode::BAD_REQUEST
                }
                StoreError::ParentArchived {
                    topic_id,
                    topic_name,
                } => {
                    body.insert(
                        "topic".into(),
                        serde_json::json!({ "id": topic_id, "name": topic_name }),
                    );
                    StatusCode::BAD_REQUEST
                }
                StoreError::Constraint(detail) => {
                    tracing::debug!(detail = %detail, "write rejected by constraint");
                    body.insert("error".into(), "Conflicts with existing data".into());
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Validation(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            body.insert("error".into(), "Internal server error".into());
        }
        body.entry("error").or_insert_with(|| self.to_string().into());

        (status, axum::Json(serde_json::Value::Object(body))).into_response()
    }
}
