use std::fmt;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::llm::GenerationError;

/// Stage of a single pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Retrieving,
    Assembling,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Generating => "generating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error shared by the stores, the retriever and the pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("pipeline failed while {stage}: {source}")]
    PipelineStage {
        stage: PipelineStage,
        #[source]
        source: Box<RagError>,
    },
}

impl RagError {
    pub fn storage<E: fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    pub fn at_stage(stage: PipelineStage, source: RagError) -> Self {
        RagError::PipelineStage {
            stage,
            source: Box::new(source),
        }
    }

    /// Stable machine-readable code surfaced at the HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::NotFound(_) => "not_found",
            RagError::Validation(_) => "validation_error",
            RagError::Storage(_) => "storage_error",
            RagError::Embedding(_) => "embedding_error",
            RagError::Generation(_) => "generation_error",
            RagError::PipelineStage { .. } => "pipeline_stage_error",
        }
    }

    /// The stage tag when this error came out of the pipeline.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            RagError::PipelineStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        RagError::storage(err)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error: {0}")]
    BadGateway(String),
    #[error("{code}: {detail}")]
    Internal { code: &'static str, detail: String },
}

impl ApiError {
    pub fn internal<E: fmt::Display>(err: E) -> Self {
        ApiError::Internal {
            code: "internal_error",
            detail: err.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadGateway(_) => "generation_error",
            ApiError::Internal { code, .. } => code,
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NotFound(msg) => ApiError::NotFound(msg),
            RagError::Validation(msg) => ApiError::BadRequest(msg),
            RagError::Generation(inner) => ApiError::BadGateway(inner.to_string()),
            other => ApiError::Internal {
                code: other.code(),
                detail: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match &self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::BadGateway(msg) => {
                msg.clone()
            }
            ApiError::Internal { detail, .. } => detail.clone(),
        };

        let body = Json(json!({ "error": self.code(), "detail": detail }));
        (status, body).into_response()
    }
}
