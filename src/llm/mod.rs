//! External text generation.
//!
//! `GenerationClient` is the only component that talks to the model
//! provider; it wraps every call with a per-attempt deadline, bounded
//! retries with jittered exponential backoff and an overall timeout.

mod client;
mod openai;
mod provider;
mod retry;
mod types;

pub use client::{GenerationClient, GenerationError};
pub use openai::OpenAiProvider;
pub use provider::{GenerationProvider, ProviderError};
pub use retry::RetryPolicy;
pub use types::{ChatMessage, ChatRequest, GenerationOptions};
