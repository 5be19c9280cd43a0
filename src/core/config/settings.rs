use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_PHRASE: &str =
    "I don't have enough information to answer that question.";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on the given context.";

/// Typed view over the merged `config.yml` + `secrets.yaml` tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub prompt: PromptSettings,
    pub generation: GenerationSettings,
    pub feedback: FeedbackSettings,
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Relative paths resolve against the data directory.
    pub db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "rag_chatbot.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hashing,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub dimensions: usize,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout for remote embedding calls.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Hashing,
            dimensions: 384,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub max_context_chars: usize,
    pub fallback_phrase: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 6000,
            fallback_phrase: DEFAULT_FALLBACK_PHRASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub timeout_secs: u64,
    pub attempt_timeout_secs: u64,
    pub api_key: Option<String>,
    pub retry: RetrySettings,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_secs: 120,
            attempt_timeout_secs: 30,
            api_key: None,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub min_rating: i64,
    pub max_rating: i64,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            min_rating: 0,
            max_rating: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub answer_samples: usize,
    pub retrieval_queries: usize,
    pub k: usize,
    pub seed: u64,
    pub concurrency: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            answer_samples: 50,
            retrieval_queries: 100,
            k: 10,
            seed: 42,
            concurrency: 4,
        }
    }
}
