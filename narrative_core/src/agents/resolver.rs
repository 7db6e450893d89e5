//! Capability resolution - turning a configured model handle into a capability.

use std::collections::HashMap;
use std::sync::Arc;
use story_model::AgentKind;

use super::heuristic;
use super::{AgentParams, AnalysisCapability};
use crate::error::ConfigurationError;

/// Resolves `agents.<kind>.model_path` into a loaded capability.
pub trait CapabilityResolver: Send + Sync {
    /// Load the capability for one agent.
    ///
    /// Errors exclude that agent from the registry; they never abort the build.
    fn resolve(
        &self,
        kind: AgentKind,
        model_path: &str,
        params: &AgentParams,
    ) -> Result<Arc<dyn AnalysisCapability>, ConfigurationError>;
}

/// Factory that builds a capability from an agent's parameters.
pub type CapabilityFactory =
    Arc<dyn Fn(&AgentParams) -> Result<Arc<dyn AnalysisCapability>, String> + Send + Sync>;

/// A table of registered capabilities keyed by (kind, model handle).
///
/// Handles that are not in the table do not resolve.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    factories: HashMap<(AgentKind, String), CapabilityFactory>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a model handle.
    pub fn register<F>(&mut self, kind: AgentKind, model_path: impl Into<String>, factory: F)
    where
        F: Fn(&AgentParams) -> Result<Arc<dyn AnalysisCapability>, String> + Send + Sync + 'static,
    {
        self.factories
            .insert((kind, model_path.into()), Arc::new(factory));
    }

    /// Register an already-built capability for a model handle.
    pub fn with_capability(
        mut self,
        kind: AgentKind,
        model_path: impl Into<String>,
        capability: Arc<dyn AnalysisCapability>,
    ) -> Self {
        self.register(kind, model_path, move |_| Ok(capability.clone()));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl CapabilityResolver for CapabilityTable {
    fn resolve(
        &self,
        kind: AgentKind,
        model_path: &str,
        params: &AgentParams,
    ) -> Result<Arc<dyn AnalysisCapability>, ConfigurationError> {
        let unresolved = |reason: String| ConfigurationError::UnresolvedCapability {
            kind,
            model_path: model_path.to_string(),
            reason,
        };

        let factory = self
            .factories
            .get(&(kind, model_path.to_string()))
            .ok_or_else(|| unresolved("no capability registered for this handle".to_string()))?;

        factory(params).map_err(unresolved)
    }
}

/// Resolves every handle to the built-in lexicon and pattern capabilities.
///
/// The model handle itself is not loaded; theme corpora and emotion lexicons
/// are read from disk when the configured file exists and the built-in word
/// lists are used otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicResolver;

impl HeuristicResolver {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityResolver for HeuristicResolver {
    fn resolve(
        &self,
        kind: AgentKind,
        model_path: &str,
        params: &AgentParams,
    ) -> Result<Arc<dyn AnalysisCapability>, ConfigurationError> {
        if params.kind() != kind {
            return Err(ConfigurationError::UnresolvedCapability {
                kind,
                model_path: model_path.to_string(),
                reason: format!("parameters are for agent '{}'", params.kind()),
            });
        }

        heuristic::build(params).map_err(|reason| ConfigurationError::UnresolvedCapability {
            kind,
            model_path: model_path.to_string(),
            reason,
        })
    }
}
