use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("row {row}: cannot parse Date {value:?}: {source}")]
    Parse {
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("no ride records to transform")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    FeatureLength { got: usize, expected: usize },
    #[error("encoded label {0} has no class")]
    UnknownClass(usize),
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("prediction failed: {}", self);
        } else {
            tracing::warn!("rejected request: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
