use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::GenerationSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion call as sent to a provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Per-call generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    /// Must lie in `[0, 2]`.
    pub temperature: f32,
    /// Must be greater than zero.
    pub max_output_tokens: u32,
    /// Overall deadline covering every attempt and backoff sleep.
    pub timeout: Option<Duration>,
}

impl GenerationOptions {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_output_tokens: settings.max_tokens,
            timeout: Some(Duration::from_secs(settings.timeout_secs)),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model name must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_defaults_are_valid() {
        let options = GenerationOptions::from_settings(&GenerationSettings::default());
        assert_eq!(options.max_output_tokens, 150);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let base = GenerationOptions::from_settings(&GenerationSettings::default());

        let hot = GenerationOptions {
            temperature: 2.5,
            ..base.clone()
        };
        assert!(hot.validate().unwrap_err().contains("temperature"));

        let nan = GenerationOptions {
            temperature: f32::NAN,
            ..base.clone()
        };
        assert!(nan.validate().is_err());

        let silent = GenerationOptions {
            max_output_tokens: 0,
            ..base
        };
        assert!(silent.validate().unwrap_err().contains("max_output_tokens"));
    }
}
