use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::provider::{GenerationProvider, ProviderError};
use super::retry::RetryPolicy;
use super::types::{ChatMessage, ChatRequest, GenerationOptions};
use super::OpenAiProvider;
use crate::core::config::GenerationSettings;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    #[error("generation rejected by provider: {source}")]
    Rejected {
        #[source]
        source: ProviderError,
    },
    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("invalid generation options: {0}")]
    InvalidOptions(String),
}

/// Single gateway to the external model. Owns retries and deadlines.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    policy: RetryPolicy,
    system_prompt: String,
    attempt_timeout: Duration,
}

impl GenerationClient {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        policy: RetryPolicy,
        system_prompt: impl Into<String>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            policy,
            system_prompt: system_prompt.into(),
            attempt_timeout,
        }
    }

    pub fn from_settings(settings: &GenerationSettings) -> Self {
        let provider = Arc::new(OpenAiProvider::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
        ));
        Self::with_provider(provider, settings)
    }

    /// Settings-driven client around a caller-supplied provider.
    pub fn with_provider(provider: Arc<dyn GenerationProvider>, settings: &GenerationSettings) -> Self {
        Self::new(
            provider,
            RetryPolicy::from(&settings.retry),
            settings.system_prompt.clone(),
            Duration::from_secs(settings.attempt_timeout_secs.max(1)),
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        options.validate().map_err(GenerationError::InvalidOptions)?;

        let request = ChatRequest {
            model: options.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(prompt),
            ],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_with_retry(&request))
                .await
                .map_err(|_| GenerationError::TimedOut(limit))?,
            None => self.run_with_retry(&request).await,
        }
    }

    async fn run_with_retry(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.attempt_timeout, self.provider.chat(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "no response within {:?}",
                        self.attempt_timeout
                    ))),
                };

            let err = match outcome {
                Ok(text) => {
                    tracing::debug!(attempt, provider = self.provider.name(), "generation succeeded");
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::error!(attempt, "generation failed permanently: {}", err);
                return Err(GenerationError::Rejected { source: err });
            }
            if attempt >= self.policy.max_attempts {
                tracing::error!(attempt, "generation retries exhausted: {}", err);
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.policy.delay_for_retry(attempt - 1);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient generation failure, retrying: {}",
                err
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays queued outcomes; repeats the last one when the queue runs dry.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn clone_outcome(outcome: &Result<String, ProviderError>) -> Result<String, ProviderError> {
        match outcome {
            Ok(text) => Ok(text.clone()),
            Err(ProviderError::RateLimited(m)) => Err(ProviderError::RateLimited(m.clone())),
            Err(ProviderError::Auth(m)) => Err(ProviderError::Auth(m.clone())),
            Err(ProviderError::Server { status, body }) => Err(ProviderError::Server {
                status: *status,
                body: body.clone(),
            }),
            Err(other) => Err(ProviderError::Transport(other.to_string())),
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                clone_outcome(script.front().unwrap())
            }
        }
    }

    fn client(provider: Arc<ScriptedProvider>, attempts: u32) -> GenerationClient {
        GenerationClient::new(
            provider,
            RetryPolicy::immediate(attempts),
            "system",
            Duration::from_secs(5),
        )
    }

    fn options() -> GenerationOptions {
        GenerationOptions::from_settings(&GenerationSettings::default()).with_timeout(None)
    }

    #[tokio::test]
    async fn success_needs_a_single_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("answer".to_string())]));
        let answer = client(provider.clone(), 3)
            .generate("prompt", &options())
            .await
            .unwrap();
        assert_eq!(answer, "answer");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited("slow down".to_string())),
            Err(ProviderError::Server {
                status: 503,
                body: "busy".to_string(),
            }),
            Ok("third time".to_string()),
        ]));
        let answer = client(provider.clone(), 3)
            .generate("prompt", &options())
            .await
            .unwrap();
        assert_eq!(answer, "third time");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_the_attempt_bound() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            ProviderError::RateLimited("429".to_string()),
        )]));
        let err = client(provider.clone(), 3)
            .generate("prompt", &options())
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 3);
        match err {
            GenerationError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, ProviderError::RateLimited(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Auth(
            "bad key".to_string(),
        ))]));
        let err = client(provider.clone(), 5)
            .generate("prompt", &options())
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 1);
        assert!(matches!(err, GenerationError::Rejected { .. }));
    }

    #[tokio::test]
    async fn invalid_options_never_reach_the_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("x".to_string())]));
        let bad = GenerationOptions {
            temperature: 3.0,
            ..options()
        };
        let err = client(provider.clone(), 3)
            .generate("prompt", &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOptions(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn slow_attempts_count_as_transient_timeouts() {
        let provider = Arc::new(ScriptedProvider {
            delay: Duration::from_millis(200),
            ..ScriptedProvider::new(vec![Ok("late".to_string())])
        });
        let client = GenerationClient::new(
            provider.clone(),
            RetryPolicy::immediate(2),
            "system",
            Duration::from_millis(20),
        );
        let err = client.generate("prompt", &options()).await.unwrap_err();
        assert_eq!(provider.calls(), 2);
        assert!(matches!(
            err,
            GenerationError::Exhausted {
                source: ProviderError::Timeout(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn overall_timeout_aborts_promptly() {
        let provider = Arc::new(ScriptedProvider {
            delay: Duration::from_secs(10),
            ..ScriptedProvider::new(vec![Ok("never".to_string())])
        });
        let started = std::time::Instant::now();
        let err = client(provider, 3)
            .generate(
                "prompt",
                &options().with_timeout(Some(Duration::from_millis(50))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
