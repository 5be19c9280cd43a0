use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{GenerationProvider, ProviderError};
use super::types::ChatRequest;

/// OpenAI-compatible `/v1/chat/completions` backend.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

pub(crate) fn request_body(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "stream": false,
    })
}

pub(crate) fn parse_completion(payload: &Value) -> Result<String, ProviderError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".to_string()))
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let Some(key) = &self.api_key else {
            return Err(ProviderError::Auth("no API key configured".to_string()));
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request_body(request))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        parse_completion(&payload)
    }
}
