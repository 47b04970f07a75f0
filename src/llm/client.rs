//! LLM client abstraction
//!
//! Backends (OpenAI-compatible servers, Ollama, hosted APIs) implement
//! [`LLMClient`]; the [`TieredGateway`](super::gateway::TieredGateway) maps
//! capability tiers onto them. No concrete provider ships with this crate.

use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}
