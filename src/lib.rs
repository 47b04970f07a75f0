//! # swarm-research - Scatter-Gather Research Orchestration
//!
//! Given one user query, swarm-research decomposes it into a fixed-size batch
//! of sub-queries bound to distinct information sources (Twitter/X, GitHub,
//! the web), executes them concurrently, tracks every sub-task's lifecycle and
//! synthesizes the results into one answer.
//!
//! The language model itself is an external collaborator: the pipeline talks
//! to a [`GenerationGateway`], and [`TieredGateway`] adapts any set of
//! [`LLMClient`] backends to it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use swarm_research::{ResearchDriver, SwarmConfig, TieredGateway, TracingSink};
//!
//! let config = SwarmConfig::load("swarm.toml")?;
//! let gateway = Arc::new(TieredGateway::from_config(my_client, &config.gateway));
//!
//! let driver = ResearchDriver::new(gateway, &config).with_sink(Arc::new(TracingSink));
//! let outcome = driver.run("Research the best AI coding tools for 2025").await?;
//! println!("{}", outcome.answer);
//!
//! // Later, from anywhere holding the coordinator:
//! if let Some(recent) = driver.lookup().most_recent_completed_summary() {
//!     println!("{}", recent.short_summary);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`llm`] - LLM client trait and the capability-tiered gateway
//! - [`research`] - Decomposition, execution, coordination, synthesis
//! - [`types`] - Task model and error handling
//! - [`utils`] - TOML configuration and logging setup

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// LLM client abstraction and generation gateway.
pub mod llm;
/// Scatter-gather research pipeline.
pub mod research;
/// Core types (tasks, ids, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{CapabilityTier, GenerationGateway, LLMClient, TieredGateway};
pub use research::{
    ChannelSink, Coordinator, NoopSink, ProgressEvent, ProgressPhase, ProgressSink,
    ResearchDriver, ResultsLookup, TracingSink,
};
pub use types::{
    AppError, QueryId, ResearchOutcome, ResearchSummary, ResearchTask, Result, Source,
    TaskMetadata, TaskStatus,
};
pub use utils::logging::init_logging;
pub use utils::toml_config::{SwarmConfig, SwarmConfigManager};
