//! Public API types

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

use crate::ai::chat::ChatError;

// Errors

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<ChatError>() {
            Some(ChatError::EmptyMessage | ChatError::MessageTooLong { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Some(ChatError::Provider(_)) => StatusCode::BAD_GATEWAY,
            Some(ChatError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Some(ChatError::Store(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Always log the error
        tracing::error!("{:#}", self.0);

        // Validation errors are safe to echo back, anything else stays
        // in the logs
        let message = match status {
            StatusCode::UNPROCESSABLE_ENTITY => self.0.to_string(),
            StatusCode::GATEWAY_TIMEOUT => "The language model did not respond in time".to_string(),
            _ => "Something went wrong".to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}
