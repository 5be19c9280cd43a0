use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use rag_chatbot::core::config::AppPaths;
use rag_chatbot::core::logging;
use rag_chatbot::server;
use rag_chatbot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "server.log");

    let state = AppState::initialize(paths).await?;

    let bind_addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("RAG_CHATBOT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    match state.store.count().await {
        Ok(0) => tracing::warn!("Document store is empty; run rag-ingest to load a corpus"),
        Ok(count) => tracing::info!("Serving {} documents", count),
        Err(e) => tracing::error!("Failed to count documents: {}", e),
    }

    let app: Router = server::router::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
