use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use rag_chatbot::core::config::{AppPaths, Settings};
use rag_chatbot::llm::{ChatRequest, GenerationProvider, ProviderError};
use rag_chatbot::server::router::router;
use rag_chatbot::state::AppState;

/// Answers every prompt with the same text, or rejects every call.
struct ScriptedProvider {
    answer: Option<&'static str>,
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        match self.answer {
            Some(text) => Ok(text.to_string()),
            None => Err(ProviderError::Auth("invalid api key".to_string())),
        }
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    _data_dir: tempfile::TempDir,
}

impl TestServer {
    async fn start(answer: Option<&'static str>) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(
            data_dir.path().to_path_buf(),
            data_dir.path().to_path_buf(),
        ));
        let mut settings = Settings::default();
        settings.embedding.dimensions = 64;
        settings.generation.retry.initial_delay_ms = 0;

        let state = AppState::build(paths, settings, Some(Arc::new(ScriptedProvider { answer })))
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _data_dir: data_dir,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }
}

#[tokio::test]
async fn feedback_updates_stats() {
    let server = TestServer::start(Some("unused")).await;

    let (status, stats) = server.get("/stats").await;
    assert_eq!(status, 200);
    assert_eq!(stats["total_feedback"], 0);
    assert_eq!(stats["average_rating"], 0.0);

    for rating in [5, 2] {
        let (status, body) = server
            .post(
                "/feedback",
                json!({"query": "What is a safety?", "response": "Two points.", "rating": rating}),
            )
            .await;
        assert_eq!(status, 200);
        assert!(body["status"].is_string());
    }

    let (_, stats) = server.get("/stats").await;
    assert_eq!(stats["total_feedback"], 2);
    assert_eq!(stats["average_rating"], 3.5);
}

#[tokio::test]
async fn out_of_range_rating_is_a_validation_error() {
    let server = TestServer::start(Some("unused")).await;

    let (status, body) = server
        .post("/feedback", json!({"query": "q", "response": "r", "rating": 42}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
    assert!(body["detail"].as_str().unwrap().contains("42"));

    let (_, stats) = server.get("/stats").await;
    assert_eq!(stats["total_feedback"], 0);
}

#[tokio::test]
async fn malformed_bodies_and_paths_use_the_error_envelope() {
    let server = TestServer::start(Some("unused")).await;

    let (status, body) = server
        .post("/feedback", json!({"query": "q", "response": "r", "rating": "five"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
    assert!(body["detail"].is_string());

    let (status, body) = server.post("/query", json!({"question": "missing text"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = server.get("/documents/abc").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn query_answers_from_the_corpus_and_is_counted() {
    let server = TestServer::start(Some("The fox is quick and brown.")).await;

    for content in [
        "The quick brown fox jumps over the lazy dog",
        "A journey of a thousand miles begins with a single step",
    ] {
        let (status, body) = server.post("/documents", json!({"content": content})).await;
        assert_eq!(status, 200);
        assert_eq!(body["embedded"], true);
    }

    let (status, body) = server.post("/query", json!({"text": "quick fox"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["response"], "The fox is quick and brown.");
    let sources = body["sources"].as_array().unwrap();
    assert!(!sources.is_empty() && sources.len() <= 3);
    assert!(sources[0]["content"]
        .as_str()
        .unwrap()
        .contains("quick brown fox"));

    let (_, stats) = server.get("/stats").await;
    assert_eq!(stats["total_queries"], 1);

    let (_, health) = server.get("/health").await;
    assert_eq!(health["documents"], 2);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let server = TestServer::start(Some("unused")).await;
    let (status, body) = server.post("/query", json!({"text": "  "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn generation_failure_surfaces_stage_error() {
    let server = TestServer::start(None).await;
    server
        .post("/documents", json!({"content": "Holding costs ten yards"}))
        .await;

    let (status, body) = server.post("/query", json!({"text": "holding"})).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "pipeline_stage_error");
    assert!(body["detail"].as_str().unwrap().contains("generating"));

    let (_, stats) = server.get("/stats").await;
    assert_eq!(stats["total_queries"], 0);
}

#[tokio::test]
async fn documents_can_be_fetched_by_id() {
    let server = TestServer::start(Some("unused")).await;
    let (_, created) = server
        .post("/documents", json!({"content": "A field goal is worth three points"}))
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, doc) = server.get(&format!("/documents/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(doc["content"], "A field goal is worth three points");
    assert_eq!(doc["has_embedding"], true);

    let (status, missing) = server.get("/documents/9999").await;
    assert_eq!(status, 404);
    assert_eq!(missing["error"], "not_found");
}
