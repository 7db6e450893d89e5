//! # Story Model
//!
//! Plain data shared by the StoryStream crates: what analysis agents produce,
//! the merged narrative model built from their output, knowledge base entries,
//! and the typed configuration the engine is constructed from.
//!
//! This crate contains no orchestration or inference logic.

pub mod analysis;
pub mod config;
pub mod knowledge;
pub mod narrative;
pub mod normalize;

pub use analysis::*;
pub use config::*;
pub use knowledge::*;
pub use narrative::*;
pub use normalize::*;
