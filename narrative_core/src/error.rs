//! Error types for the narrative core.
//!
//! Per-agent and per-key failures are absorbed close to where they happen;
//! only the engine-level variants of [`NarrativeError`] reach callers.

use std::time::Duration;

use story_model::{AgentKind, ConfigError};
use thiserror::Error;

use crate::generation::GeneratorError;

/// Main error type returned by [`crate::NarrativeEngine`].
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    KnowledgeUnavailable(#[from] KnowledgeUnavailableError),

    #[error("no analysis capability: every agent is disabled or unavailable and knowledge integration is disabled")]
    NoAnalysisCapability,

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Malformed or missing agent/knowledge configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("agent '{kind}' is missing required parameter '{param}'")]
    MissingParameter { kind: AgentKind, param: &'static str },

    #[error("agent '{kind}' parameter '{param}' is invalid: {reason}")]
    InvalidParameter {
        kind: AgentKind,
        param: &'static str,
        reason: String,
    },

    #[error("agent '{kind}' has no model_path")]
    MissingModelPath { kind: AgentKind },

    #[error("agent '{kind}' model '{model_path}' could not be loaded: {reason}")]
    UnresolvedCapability {
        kind: AgentKind,
        model_path: String,
        reason: String,
    },

    #[error("knowledge integration is enabled but no knowledge backend was provided")]
    MissingKnowledgeBackend,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One agent's `analyze` call failed. Never propagated past the engine.
#[derive(Debug, Error)]
pub enum AgentExecutionError {
    #[error("agent '{kind}' timed out after {after:?}")]
    Timeout { kind: AgentKind, after: Duration },

    #[error("agent '{kind}' failed: {reason}")]
    Failed { kind: AgentKind, reason: String },

    #[error("agent '{expected}' returned a result for '{actual}'")]
    KindMismatch {
        expected: AgentKind,
        actual: AgentKind,
    },
}

impl AgentExecutionError {
    /// Convenience constructor for capability implementations.
    pub fn failed(kind: AgentKind, reason: impl Into<String>) -> Self {
        AgentExecutionError::Failed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            AgentExecutionError::Timeout { kind, .. } | AgentExecutionError::Failed { kind, .. } => {
                *kind
            }
            AgentExecutionError::KindMismatch { expected, .. } => *expected,
        }
    }
}

/// The knowledge backend could not resolve a single key.
#[derive(Debug, Error)]
#[error("knowledge base unavailable: none of {attempted} keys could be resolved{}", last_error_suffix(.last_error))]
pub struct KnowledgeUnavailableError {
    pub attempted: usize,
    pub last_error: Option<String>,
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last error: {e})"))
        .unwrap_or_default()
}

/// The generative capability failed. Not retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no text generator is configured")]
    NotConfigured,

    #[error("generation timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("generator failed: {0}")]
    Failed(#[from] GeneratorError),

    #[error("generator returned an empty continuation")]
    EmptyResponse,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, NarrativeError>;
