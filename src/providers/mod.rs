// src/providers/mod.rs

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::Result;

pub mod ollama;

/// A single generation call: the prompt plus the knobs fixed at the call site.
#[derive(Debug, Clone)]
pub struct ExplanationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

/// A common trait for Large Language Model (LLM) providers.
///
/// Implementations return the complete generated text, already trimmed. An
/// empty string means the model answered but said nothing.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: &ExplanationRequest) -> Result<String>;
}
