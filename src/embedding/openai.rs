use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{EmbeddingError, EmbeddingProvider};

#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(base_url: String, model: String, dimensions: usize, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimensions,
            api_key,
            timeout: Duration::from_secs(30),
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reads `data[0].embedding` and checks it has the configured length.
pub(crate) fn parse_embedding_payload(
    payload: &Value,
    dimensions: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let values = payload["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("missing data[0].embedding".to_string()))?;

    if values.len() != dimensions {
        return Err(EmbeddingError::Malformed(format!(
            "expected {} dimensions, got {}",
            dimensions,
            values.len()
        )));
    }

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::Malformed("non-numeric embedding value".to_string()))
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": text,
        });

        let mut request = self.client.post(&url).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body: text });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;
        parse_embedding_payload(&payload, self.dimensions)
    }
}
