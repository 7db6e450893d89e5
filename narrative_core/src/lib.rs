//! # Narrative Core
//!
//! Orchestrates multi-agent narrative analysis on top of the `story_model`
//! data types: agents analyze a text concurrently, their results merge into
//! one [`NarrativeModel`](story_model::NarrativeModel), the model is enriched
//! from a knowledge base, and a generative model continues the story.
//!
//! ## Core Components
//!
//! - **agents**: the five agent kinds, capability resolution and the registry
//! - **merger**: deterministic merge of agent results
//! - **knowledge_base**: knowledge backends and the fail-soft integrator
//! - **generation**: prompt context assembly and text generators
//! - **engine**: the `analyze_narrative` / `generate_continuation` orchestrator
//!
//! ## Design Philosophy
//!
//! - **Order-Free**: merge output never depends on which agent finished first
//! - **Fail-Soft**: one agent or one knowledge key failing never sinks a sibling
//! - **Injected**: models, stores and generators are capabilities passed in at build time

pub mod agents;
pub mod engine;
pub mod error;
pub mod generation;
pub mod knowledge_base;
pub mod merger;
pub mod testing;

pub use agents::{
    Agent, AgentParams, AgentRegistry, AnalysisCapability, CapabilityResolver, CapabilityTable,
    HeuristicResolver,
};
pub use engine::*;
pub use error::*;
pub use generation::{GenerationAdapter, GenerationContext, GenerationRequest, TextGenerator};
pub use knowledge_base::{InMemoryKnowledgeBase, KnowledgeBackend, KnowledgeIntegrator};
pub use merger::NarrativeMerger;
