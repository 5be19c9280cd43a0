use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

/// Failure of a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("provider returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Rate limits, timeouts, 5xx responses and dropped connections are
    /// worth another attempt. Everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::Timeout(_)
                | ProviderError::Server { .. }
                | ProviderError::Transport(_)
        )
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => ProviderError::RateLimited(body),
            408 => ProviderError::Timeout(body),
            401 | 403 => ProviderError::Auth(body),
            500..=599 => ProviderError::Server { status, body },
            _ => ProviderError::InvalidRequest(format!("{status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ProviderError::Transport(err.to_string())
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming), one network round trip
    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}
