use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::server::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.pipeline.execute(&payload.text, None).await?;
    Ok(Json(json!({
        "response": outcome.answer,
        "request_id": outcome.request_id,
        "sources": outcome.sources,
    })))
}
