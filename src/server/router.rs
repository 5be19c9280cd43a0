use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::ServerSettings;
use crate::server::handlers::{documents, feedback, health, query};
use crate::state::AppState;

/// Creates the application router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server);
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/query", post(query::query))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/stats", get(feedback::get_stats))
        .route("/stats/feedback", get(feedback::get_feedback_breakdown))
        .route("/documents", post(documents::add_document))
        .route("/documents/:id", get(documents::get_document))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(settings: &ServerSettings) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(settings)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(settings: &ServerSettings) -> Vec<String> {
    let origins = settings
        .cors_allowed_origins
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins(settings.port);
    }

    origins
}

/// Local front-ends: the Streamlit and Dash dev servers plus the API port.
fn default_local_origins(port: u16) -> Vec<String> {
    let mut origins = Vec::new();
    for host in ["localhost", "127.0.0.1"] {
        for p in [8501, 8050, port] {
            let origin = format!("http://{host}:{p}");
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
    }
    origins
}
