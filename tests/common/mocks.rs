//! Mock implementations for testing.
//!
//! This module provides a scripted generation gateway, a mock LLM client and a
//! recording progress sink that can be shared across test files.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swarm_research::llm::{CapabilityTier, GenerationGateway, LLMClient};
use swarm_research::research::{ProgressEvent, ProgressSink};
use swarm_research::types::{AppError, Result};

/// Sub-queries used by [`three_source_plan`].
pub const TWITTER_SUB: &str = "sentiment on ai coding assistants";
pub const GITHUB_SUB: &str = "popular ai coding assistant repositories";
pub const WEB_SUB: &str = "ai coding assistant comparison articles";

/// A well-formed plan covering twitter, github and web, in that order.
pub fn three_source_plan() -> Value {
    json!({
        "tasks": [
            {"id": "1", "source": "twitter", "query": TWITTER_SUB},
            {"id": "2", "source": "github", "query": GITHUB_SUB},
            {"id": "3", "source": "web", "query": WEB_SUB}
        ]
    })
}

/// How the gateway answers a research prompt containing a given sub-query.
#[derive(Clone)]
struct Script {
    needle: String,
    reply: Option<String>,
    delay: Duration,
}

/// Scripted [`GenerationGateway`].
///
/// Structured requests return the configured plan. Text requests on the
/// `SmallText` tier are matched to a script by sub-query; `LargeText` requests
/// return the configured synthesis answer. Every call is recorded.
///
/// # Examples
///
/// ```ignore
/// let gateway = MockGateway::new(three_source_plan())
///     .with_reply(TWITTER_SUB, "positive")
///     .with_failure(GITHUB_SUB)
///     .with_synthesis("final answer");
/// ```
pub struct MockGateway {
    plan: Option<Value>,
    scripts: Vec<Script>,
    synthesis: Option<String>,
    structured_calls: AtomicUsize,
    research_prompts: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    synthesis_prompts: Mutex<Vec<String>>,
}

impl MockGateway {
    /// Gateway that answers decomposition with `plan`.
    pub fn new(plan: Value) -> Self {
        Self {
            plan: Some(plan),
            scripts: Vec::new(),
            synthesis: Some("synthesized answer".to_string()),
            structured_calls: AtomicUsize::new(0),
            research_prompts: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            synthesis_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Gateway whose structured generation always fails.
    pub fn failing_plan() -> Self {
        let mut gateway = Self::new(Value::Null);
        gateway.plan = None;
        gateway
    }

    pub fn with_reply(self, needle: &str, reply: &str) -> Self {
        self.with_delayed_reply(needle, reply, Duration::ZERO)
    }

    pub fn with_delayed_reply(mut self, needle: &str, reply: &str, delay: Duration) -> Self {
        self.scripts.push(Script {
            needle: needle.to_string(),
            reply: Some(reply.to_string()),
            delay,
        });
        self
    }

    pub fn with_failure(mut self, needle: &str) -> Self {
        self.scripts.push(Script {
            needle: needle.to_string(),
            reply: None,
            delay: Duration::ZERO,
        });
        self
    }

    pub fn with_synthesis(mut self, answer: &str) -> Self {
        self.synthesis = Some(answer.to_string());
        self
    }

    pub fn with_failing_synthesis(mut self) -> Self {
        self.synthesis = None;
        self
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    /// Prompts received on the `SmallText` tier, in arrival order.
    pub fn research_prompts(&self) -> Vec<String> {
        self.research_prompts.lock().clone()
    }

    /// Sub-queries whose scripted reply was delivered, in completion order.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().clone()
    }

    pub fn synthesis_prompts(&self) -> Vec<String> {
        self.synthesis_prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationGateway for MockGateway {
    async fn generate_structured(&self, _prompt: &str, tier: CapabilityTier) -> Result<Value> {
        assert_eq!(tier, CapabilityTier::SmallStructured);
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.plan
            .clone()
            .ok_or_else(|| AppError::LLM("Mock plan failure".to_string()))
    }

    async fn generate_text(&self, prompt: &str, tier: CapabilityTier) -> Result<String> {
        match tier {
            CapabilityTier::LargeText => {
                self.synthesis_prompts.lock().push(prompt.to_string());
                self.synthesis
                    .clone()
                    .ok_or_else(|| AppError::LLM("Mock synthesis failure".to_string()))
            }
            _ => {
                self.research_prompts.lock().push(prompt.to_string());
                let script = self
                    .scripts
                    .iter()
                    .find(|s| prompt.contains(&s.needle))
                    .cloned();

                let Some(script) = script else {
                    return Ok(format!("default findings for: {}", prompt.len()));
                };

                if !script.delay.is_zero() {
                    tokio::time::sleep(script.delay).await;
                }
                self.finished.lock().push(script.needle.clone());
                script
                    .reply
                    .ok_or_else(|| AppError::LLM("Mock research failure".to_string()))
            }
        }
    }
}

/// Mock LLM client for testing with configurable responses.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    model: String,
    should_fail: bool,
    delay: Duration,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            model: "mock-model".to_string(),
            should_fail: false,
            delay: Duration::ZERO,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Progress sink that keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}
