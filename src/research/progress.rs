//! Progress reporting.
//!
//! The driver reports pipeline milestones through a [`ProgressSink`]. Emission
//! is fire-and-forget: sinks must not block and cannot refuse an event.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::TaskMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Started,
    Complete,
    Failed,
}

/// One progress notification for a research query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub text: String,
    /// Source and sub-query of each task; never result bodies
    pub metadata: Vec<TaskMetadata>,
}

impl ProgressEvent {
    pub fn started(query: &str, task_count: usize) -> Self {
        Self {
            phase: ProgressPhase::Started,
            text: format!(
                "Starting swarm research on: \"{}\"\nDelegating to {} specialist agents...",
                query, task_count
            ),
            metadata: Vec::new(),
        }
    }

    pub fn complete(answer: &str, metadata: Vec<TaskMetadata>) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            text: format!("Research Complete\n\n{}", answer),
            metadata,
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            phase: ProgressPhase::Failed,
            text: format!("Research failed: {}", reason),
            metadata: Vec::new(),
        }
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event.phase {
            ProgressPhase::Failed => warn!(phase = ?event.phase, "{}", event.text),
            _ => info!(phase = ?event.phase, tasks = event.metadata.len(), "{}", event.text),
        }
    }
}

/// Forwards events into an unbounded channel. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
