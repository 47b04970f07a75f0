//! Result synthesis.
//!
//! Merges completed sub-task results with the original query into one answer.
//! Blocks are laid out in batch order, never completion order, so identical
//! gateway replies always yield an identical prompt.

use std::sync::Arc;

use tracing::{debug, info};

use crate::llm::{CapabilityTier, GenerationGateway};
use crate::types::{AppError, ResearchTask, Result};

/// Note placed in the prompt when no sub-task completed.
pub const NO_RESULTS_NOTE: &str = "No research results are available: every sub-task failed.";

pub struct Synthesizer {
    gateway: Arc<dyn GenerationGateway>,
}

impl Synthesizer {
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        Self { gateway }
    }

    /// Build the synthesis prompt from the completed tasks of `tasks`.
    pub fn build_prompt(original_query: &str, tasks: &[ResearchTask]) -> String {
        let blocks: Vec<String> = tasks
            .iter()
            .filter_map(|task| {
                task.result().map(|result| {
                    format!("[{}]: {}", task.source().as_str().to_uppercase(), result)
                })
            })
            .collect();

        if blocks.is_empty() {
            return format!(
                r#"Answer the following query as well as you can.

Original Query: {original_query}

{NO_RESULTS_NOTE}

Say clearly that no source research could be gathered. Do not invent findings or attribute claims to Twitter, GitHub or web sources."#
            );
        }

        format!(
            r#"Synthesize these research findings into a clear, actionable response.

Original Query: {}

Research Results:
{}

Provide a comprehensive answer that combines insights from all sources. Highlight key findings and any conflicting information."#,
            original_query,
            blocks.join("\n\n")
        )
    }

    /// Produce the final answer. Tasks that did not complete are skipped.
    pub async fn synthesize(&self, original_query: &str, tasks: &[ResearchTask]) -> Result<String> {
        let completed = tasks.iter().filter(|t| t.is_completed()).count();
        if completed == 0 {
            info!("Synthesizing without research results");
        } else {
            debug!(completed, total = tasks.len(), "Synthesizing research results");
        }

        let prompt = Self::build_prompt(original_query, tasks);
        self.gateway
            .generate_text(&prompt, CapabilityTier::LargeText)
            .await
            .map_err(|e| AppError::Synthesis(e.to_string()))
    }
}
