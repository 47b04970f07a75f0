//! Read-side access to recent research for unrelated consumers.

use std::sync::Arc;

use crate::research::coordinator::Coordinator;
use crate::types::{QueryId, ResearchSummary, ResearchTask};
use crate::utils::toml_config::ResearchConfig;

pub struct ResultsLookup {
    coordinator: Arc<Coordinator>,
    prefix_chars: usize,
}

impl ResultsLookup {
    pub fn new(coordinator: Arc<Coordinator>, prefix_chars: usize) -> Self {
        Self {
            coordinator,
            prefix_chars: prefix_chars.max(1),
        }
    }

    pub fn from_config(coordinator: Arc<Coordinator>, config: &ResearchConfig) -> Self {
        Self::new(coordinator, config.summary_prefix_chars)
    }

    /// Summary of the most recently registered query with at least one completed task.
    pub fn most_recent_completed_summary(&self) -> Option<ResearchSummary> {
        self.coordinator.find_map_newest(|query_id, tasks| {
            summarize(query_id.clone(), tasks, self.prefix_chars)
        })
    }
}

/// Summarize one batch; `None` when nothing in it completed.
pub fn summarize(
    query_id: QueryId,
    tasks: &[ResearchTask],
    prefix_chars: usize,
) -> Option<ResearchSummary> {
    let lines: Vec<String> = tasks
        .iter()
        .filter_map(|task| {
            task.result()
                .map(|result| format!("[{}]: {}", task.source(), truncate_chars(result, prefix_chars)))
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(ResearchSummary {
        query_id,
        completed_count: lines.len(),
        total_count: tasks.len(),
        short_summary: lines.join("\n"),
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
