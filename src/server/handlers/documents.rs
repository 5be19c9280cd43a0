use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::server::extract::{ApiJson, ApiPath};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub content: String,
}

pub async fn add_document(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<AddDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (id, embedded) = state.ingestor.add_document(&payload.content).await?;
    Ok(Json(json!({"id": id, "embedded": embedded})))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.store.get(id).await?;
    Ok(Json(json!({
        "id": document.id,
        "content": document.content,
        "has_embedding": document.embedding.is_some(),
    })))
}
