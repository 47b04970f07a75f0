//! Scatter-Gather Research Coordination
//!
//! This module fans one research query out into source-bound sub-tasks,
//! executes them concurrently, tracks each task's lifecycle and synthesizes
//! the results into a single answer.
//!
//! # Architecture
//!
//! - [`decomposer::TaskDecomposer`] - Splits the query into a fixed-size batch
//! - [`executor::TaskExecutor`] - Runs one sub-task against the gateway
//! - [`coordinator::Coordinator`] - Owns per-query task state
//! - [`synthesizer::Synthesizer`] - Merges completed results
//! - [`driver::ResearchDriver`] - Sequences the pipeline and reports progress
//! - [`lookup::ResultsLookup`] - Read-side summary of recent research
//!
//! # Usage
//!
//! ```ignore
//! use swarm_research::research::{ChannelSink, ResearchDriver};
//!
//! let (sink, mut events) = ChannelSink::new();
//! let driver = ResearchDriver::new(gateway, &config).with_sink(Arc::new(sink));
//!
//! let outcome = driver
//!     .run("Research the best AI coding tools for 2025")
//!     .await?;
//!
//! println!("{}", outcome.answer);
//! for task in outcome.tasks {
//!     println!("- [{}] {}", task.source, task.query);
//! }
//! ```
//!
//! # Research Workflow
//!
//! 1. **Decomposition** - One structured request yields N sub-queries
//! 2. **Dispatch** - All N tasks run concurrently; none are cancelled on a sibling's failure
//! 3. **Tracking** - Each settled task is recorded as completed or failed
//! 4. **Synthesis** - Completed results, in batch order, become the final answer

/// Per-query task state store.
pub mod coordinator;
/// Query decomposition into source-bound sub-tasks.
pub mod decomposer;
/// Pipeline sequencing.
pub mod driver;
/// Single sub-task execution.
pub mod executor;
/// Research intent detection for chat messages.
pub mod intent;
/// Read-side summaries.
pub mod lookup;
/// Progress events and sinks.
pub mod progress;
/// Result synthesis.
pub mod synthesizer;

pub use coordinator::Coordinator;
pub use decomposer::TaskDecomposer;
pub use driver::ResearchDriver;
pub use executor::{SourceTemplates, TaskExecutor};
pub use intent::is_research_request;
pub use lookup::ResultsLookup;
pub use progress::{ChannelSink, NoopSink, ProgressEvent, ProgressPhase, ProgressSink, TracingSink};
pub use synthesizer::Synthesizer;
