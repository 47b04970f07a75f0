//! Query decomposition.
//!
//! Turns one user query into a fixed-size batch of source-bound sub-tasks with
//! a single structured generation request. The reply is validated strictly:
//! a short, padded or malformed plan is rejected rather than researched
//! partially.

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{CapabilityTier, GenerationGateway};
use crate::types::{AppError, ResearchTask, Result, Source};

/// Shape the gateway is asked to produce.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecompositionPlan {
    /// Exactly one entry per sub-task
    pub tasks: Vec<PlannedTask>,
}

/// One sub-query as proposed by the model.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlannedTask {
    /// Ordinal label of any JSON type; replaced with a fresh id on acceptance
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// One of "twitter", "github", "web"
    #[schemars(with = "Source")]
    pub source: String,
    /// Source-specific sub-query
    pub query: String,
}

pub struct TaskDecomposer {
    gateway: Arc<dyn GenerationGateway>,
    batch_size: usize,
}

impl TaskDecomposer {
    pub fn new(gateway: Arc<dyn GenerationGateway>, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Decompose `query` into exactly `batch_size` pending tasks.
    pub async fn decompose(&self, query: &str) -> Result<Vec<ResearchTask>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "research query must not be empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(query);
        let reply = self
            .gateway
            .generate_structured(&prompt, CapabilityTier::SmallStructured)
            .await
            .map_err(|e| AppError::Decomposition(format!("generation failed: {}", e)))?;

        let tasks = self.parse_plan(reply)?;
        debug!(count = tasks.len(), "Decomposed research query");
        Ok(tasks)
    }

    fn build_prompt(&self, query: &str) -> String {
        let n = self.batch_size;
        let sources = Source::ALL
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", ");
        let coverage = if n >= Source::ALL.len() {
            "Use every source at least once."
        } else {
            "Pick the sources most likely to answer the query."
        };
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(DecompositionPlan))
            .unwrap_or_default();

        format!(
            r#"Break down this research query into {n} specific sub-queries for different sources:

Query: "{query}"

Create exactly {n} research tasks. Each task uses one of these sources: {sources}.
- twitter: recent discussions and sentiment
- github: repositories and code implementations
- web: documentation and general information
{coverage}

Respond with a JSON object matching this schema:
{schema}

Example:
{{
  "tasks": [
    {{"id": "1", "source": "twitter", "query": "..."}},
    {{"id": "2", "source": "github", "query": "..."}},
    {{"id": "3", "source": "web", "query": "..."}}
  ]
}}"#
        )
    }

    fn parse_plan(&self, reply: serde_json::Value) -> Result<Vec<ResearchTask>> {
        match reply.get("tasks") {
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => {
                return Err(AppError::Decomposition(
                    "'tasks' field is not an array".to_string(),
                ))
            }
            None => {
                return Err(AppError::Decomposition(
                    "reply is missing the 'tasks' field".to_string(),
                ))
            }
        }

        let plan: DecompositionPlan = serde_json::from_value(reply)
            .map_err(|e| AppError::Decomposition(format!("malformed task list: {}", e)))?;

        if plan.tasks.len() != self.batch_size {
            warn!(
                expected = self.batch_size,
                got = plan.tasks.len(),
                "Decomposition returned wrong task count"
            );
            return Err(AppError::Decomposition(format!(
                "expected {} tasks, got {}",
                self.batch_size,
                plan.tasks.len()
            )));
        }

        let mut tasks = Vec::with_capacity(plan.tasks.len());
        for planned in plan.tasks {
            let source = Source::ALL
                .into_iter()
                .find(|s| s.as_str() == planned.source.trim().to_lowercase())
                .ok_or_else(|| {
                    AppError::Decomposition(format!("unknown source '{}'", planned.source))
                })?;
            let sub_query = planned.query.trim();
            if sub_query.is_empty() {
                return Err(AppError::Decomposition(format!(
                    "empty sub-query for source '{}'",
                    source
                )));
            }
            tasks.push(ResearchTask::new(source, sub_query));
        }

        if self.batch_size >= Source::ALL.len() {
            let covered: HashSet<Source> = tasks.iter().map(|t| t.source()).collect();
            if let Some(missing) = Source::ALL.iter().find(|s| !covered.contains(s)) {
                return Err(AppError::Decomposition(format!(
                    "no task targets source '{}'",
                    missing
                )));
            }
        }

        Ok(tasks)
    }
}
