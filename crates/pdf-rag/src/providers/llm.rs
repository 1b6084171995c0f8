//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt-in, text-out answer generation
///
/// Implementations:
/// - `OllamaGenerator`: local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`, producing at most `max_tokens` tokens
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
