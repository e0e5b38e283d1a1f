use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sethu_core::Error;

pub const SEARCH_FAILED: &str = "search failed, please try again";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error("search failed, please try again")]
    SearchFailed,
}

impl ApiError {
    /// Listing errors: bad input and missing records keep their meaning,
    /// anything else becomes the generic search failure.
    pub fn search(error: Error) -> Self {
        match error {
            Error::NotFound(_) | Error::Validation(_) => ApiError::Core(error),
            other => {
                tracing::error!("❌ Search failed: {}", other);
                ApiError::SearchFailed
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_unavailable() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
