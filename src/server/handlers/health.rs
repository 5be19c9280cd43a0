use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "rag-chatbot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /query": "Answer a question from the document corpus",
            "POST /feedback": "Rate an answer",
            "GET /stats": "Query and feedback totals",
            "GET /stats/feedback": "Rating breakdown and top queries",
            "POST /documents": "Add a document",
            "GET /documents/:id": "Fetch a document",
            "GET /health": "Liveness check",
        }
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let documents = state.store.count().await?;
    Ok(Json(json!({
        "status": "ok",
        "documents": documents,
    })))
}
