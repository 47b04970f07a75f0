//! LLM Provider Abstractions and the Generation Gateway
//!
//! The research pipeline consumes text and object generation through the
//! [`GenerationGateway`] trait. The stock implementation, [`TieredGateway`],
//! routes each [`CapabilityTier`] to an [`LLMClient`] backend.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that model backends implement
//! - [`GenerationGateway`] - Prompt + tier in, text or JSON object out
//! - [`TieredGateway`] - Tier-to-backend routing with per-request timeouts

/// Core LLM client trait.
pub mod client;
/// Capability-tiered generation gateway.
pub mod gateway;

pub use client::LLMClient;
pub use gateway::{CapabilityTier, GenerationGateway, TieredGateway};
