use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::server::extract::ApiJson;
use crate::feedback::Feedback;
use crate::state::AppState;

const TOP_QUERY_LIMIT: usize = 10;

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<Feedback>,
) -> Result<impl IntoResponse, ApiError> {
    state.feedback.record(&payload).await?;
    Ok(Json(json!({"status": "Feedback received"})))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.feedback.stats().await?;
    Ok(Json(stats))
}

/// Aggregates for the monitoring dashboard.
pub async fn get_feedback_breakdown(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let distribution = state.feedback.rating_distribution().await?;
    let daily = state.feedback.daily_average_rating().await?;
    let top_queries = state.feedback.top_queries(TOP_QUERY_LIMIT).await?;
    Ok(Json(json!({
        "rating_distribution": distribution,
        "daily_average_rating": daily,
        "top_queries": top_queries,
    })))
}
