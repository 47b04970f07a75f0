//! Generation Gateway
//!
//! The research pipeline never talks to a model directly. It asks a
//! [`GenerationGateway`] for either a structured object or free text and
//! passes a [`CapabilityTier`] as a cost/quality hint. [`TieredGateway`] is
//! the stock implementation: it routes each tier to an [`LLMClient`] and
//! enforces a per-request timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use swarm_research::llm::{CapabilityTier, TieredGateway};
//!
//! let gateway = TieredGateway::new(small_client)
//!     .with_tier(CapabilityTier::LargeText, large_client)
//!     .with_request_timeout(Duration::from_secs(30));
//!
//! let answer = gateway.generate_text("Summarize ...", CapabilityTier::LargeText).await?;
//! ```

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use crate::utils::toml_config::GatewayConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;

/// Hint to the backend about the quality/cost/size a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    /// Small model, JSON object output (decomposition)
    SmallStructured,
    /// Small model, free text (per-source research)
    SmallText,
    /// Large model, free text (synthesis)
    LargeText,
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityTier::SmallStructured => "small_structured",
            CapabilityTier::SmallText => "small_text",
            CapabilityTier::LargeText => "large_text",
        };
        f.write_str(s)
    }
}

/// Text/object generation capability consumed by the research pipeline.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate a structured (JSON object) reply.
    ///
    /// Implementations must fail with an error when the reply is not a JSON
    /// object rather than coercing it into one.
    async fn generate_structured(
        &self,
        prompt: &str,
        tier: CapabilityTier,
    ) -> Result<serde_json::Value>;

    /// Generate a free-text reply.
    async fn generate_text(&self, prompt: &str, tier: CapabilityTier) -> Result<String>;
}

const STRUCTURED_SYSTEM_PROMPT: &str =
    "You are a planning component. Respond with a single valid JSON object and nothing else.";

const TEXT_SYSTEM_PROMPT: &str = "You are a thorough research assistant.";

/// Gateway that maps capability tiers onto concrete LLM clients.
pub struct TieredGateway {
    clients: HashMap<CapabilityTier, Box<dyn LLMClient>>,
    fallback: Box<dyn LLMClient>,
    request_timeout: Duration,
}

impl TieredGateway {
    /// Create a gateway that sends every tier to `fallback` until tiers are mapped.
    pub fn new(fallback: Box<dyn LLMClient>) -> Self {
        Self {
            clients: HashMap::new(),
            fallback,
            request_timeout: GatewayConfig::default().request_timeout(),
        }
    }

    /// Create a gateway using timeouts from configuration.
    pub fn from_config(fallback: Box<dyn LLMClient>, config: &GatewayConfig) -> Self {
        Self::new(fallback).with_request_timeout(config.request_timeout())
    }

    /// Route `tier` to a dedicated client.
    pub fn with_tier(mut self, tier: CapabilityTier, client: Box<dyn LLMClient>) -> Self {
        self.clients.insert(tier, client);
        self
    }

    /// Bound every backend call by `request_timeout`.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Model that serves `tier`.
    pub fn model_for(&self, tier: CapabilityTier) -> &str {
        self.client_for(tier).model_name()
    }

    fn client_for(&self, tier: CapabilityTier) -> &dyn LLMClient {
        self.clients
            .get(&tier)
            .map(|c| c.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    async fn call(&self, tier: CapabilityTier, system: &str, prompt: &str) -> Result<String> {
        let client = self.client_for(tier);
        tracing::debug!(tier = %tier, model = client.model_name(), "Gateway request");

        timeout(self.request_timeout, client.generate_with_system(system, prompt))
            .await
            .map_err(|_| {
                AppError::LLM(format!(
                    "{} request to '{}' timed out after {:?}",
                    tier,
                    client.model_name(),
                    self.request_timeout
                ))
            })?
    }
}

#[async_trait]
impl GenerationGateway for TieredGateway {
    async fn generate_structured(
        &self,
        prompt: &str,
        tier: CapabilityTier,
    ) -> Result<serde_json::Value> {
        let raw = self.call(tier, STRUCTURED_SYSTEM_PROMPT, prompt).await?;
        parse_json_object(&raw)
    }

    async fn generate_text(&self, prompt: &str, tier: CapabilityTier) -> Result<String> {
        self.call(tier, TEXT_SYSTEM_PROMPT, prompt).await
    }
}

/// Parse a model reply as a JSON object.
///
/// Models often wrap JSON in markdown fences or a sentence of prose; both are
/// tolerated. Anything that does not contain a JSON object is an error.
pub fn parse_json_object(raw: &str) -> Result<serde_json::Value> {
    let raw = raw.trim();
    let trimmed = strip_code_fence(raw);

    let value = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value,
        Err(first_err) => {
            // Search the whole reply, not the fence body, for the outermost object.
            let start = raw.find('{');
            let end = raw.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&raw[start..=end]).map_err(|e| {
                        AppError::LLM(format!("Structured reply is not valid JSON: {}", e))
                    })?
                }
                _ => {
                    return Err(AppError::LLM(format!(
                        "Structured reply is not valid JSON: {}",
                        first_err
                    )));
                }
            }
        }
    };

    if !value.is_object() {
        return Err(AppError::LLM(format!(
            "Structured reply must be a JSON object, got: {}",
            value
        )));
    }

    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
