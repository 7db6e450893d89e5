//! Agent registry - builds the active agent set from configuration.

use std::time::Duration;
use story_model::{AgentKind, AgentsConfig};
use tracing::{debug, warn};

use super::{Agent, AgentParams, CapabilityResolver};
use crate::error::ConfigurationError;

/// An enabled agent that could not be brought up.
#[derive(Debug)]
pub struct UnavailableAgent {
    pub kind: AgentKind,
    pub reason: ConfigurationError,
}

/// The active agents, always in priority order (Causal, Character, Setting,
/// Theme, Emotional), at most one per kind.
///
/// Built once per engine and read-only afterwards.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    unavailable: Vec<UnavailableAgent>,
}

impl AgentRegistry {
    /// Build the agent set for every enabled kind.
    ///
    /// A missing or invalid kind-specific parameter fails the whole build. A
    /// capability that does not resolve only excludes that agent.
    pub fn build(
        config: &AgentsConfig,
        resolver: &dyn CapabilityResolver,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::default();

        for (kind, settings) in config.iter() {
            if !settings.enabled {
                debug!(kind = %kind, "agent disabled");
                continue;
            }

            let params = AgentParams::from_settings(kind, settings)?;

            let resolved = match settings.model_path.as_deref().map(str::trim) {
                Some(model_path) if !model_path.is_empty() => resolver
                    .resolve(kind, model_path, &params)
                    .map(|capability| (model_path.to_string(), capability)),
                _ => Err(ConfigurationError::MissingModelPath { kind }),
            };

            match resolved {
                Ok((model_path, capability)) => {
                    debug!(kind = %kind, model_path = %model_path, "agent registered");
                    registry.agents.push(Agent::new(
                        params,
                        model_path,
                        Duration::from_millis(settings.timeout_ms),
                        capability,
                    ));
                }
                Err(reason) => {
                    warn!(kind = %kind, error = %reason, "agent unavailable, excluding it");
                    registry.unavailable.push(UnavailableAgent { kind, reason });
                }
            }
        }

        Ok(registry)
    }

    /// Build a registry from ready-made agents.
    ///
    /// Agents are put in priority order; for a repeated kind the first one wins.
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let mut registry = Self::default();
        for agent in agents {
            if registry.get(agent.kind()).is_none() {
                registry.agents.push(agent);
            }
        }
        registry.agents.sort_by_key(|agent| agent.kind());
        registry
    }

    /// Active agents in priority order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, kind: AgentKind) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<AgentKind> {
        self.agents.iter().map(Agent::kind).collect()
    }

    /// Enabled agents that were excluded, with the reason.
    pub fn unavailable(&self) -> &[UnavailableAgent] {
        &self.unavailable
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{CapabilityTable, HeuristicResolver};
    use crate::testing::ScriptedCapability;
    use std::sync::Arc;
    use story_model::{AgentResult, AgentSettings};

    #[test]
    fn test_build_all_defaults() {
        let registry = AgentRegistry::build(&AgentsConfig::default(), &HeuristicResolver::new()).unwrap();

        assert_eq!(registry.kinds(), AgentKind::ALL.to_vec());
        assert!(registry.unavailable().is_empty());
    }

    #[test]
    fn test_disabled_agents_omitted() {
        let mut config = AgentsConfig::default();
        config.enable_only(&[AgentKind::Emotional, AgentKind::Character]);

        let registry = AgentRegistry::build(&config, &HeuristicResolver::new()).unwrap();
        assert_eq!(registry.kinds(), vec![AgentKind::Character, AgentKind::Emotional]);
    }

    #[test]
    fn test_nothing_enabled_is_empty() {
        let mut config = AgentsConfig::default();
        config.enable_only(&[]);

        let registry = AgentRegistry::build(&config, &HeuristicResolver::new()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.unavailable().is_empty());
    }

    #[test]
    fn test_missing_param_is_fatal() {
        let mut config = AgentsConfig::default();
        config.setting = AgentSettings::enabled("models/setting_agent.pkl");

        let err = AgentRegistry::build(&config, &HeuristicResolver::new()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingParameter {
                kind: AgentKind::Setting,
                param: "default_timeline"
            }
        ));
    }

    #[test]
    fn test_missing_param_on_disabled_agent_ignored() {
        let mut config = AgentsConfig::default();
        config.setting = AgentSettings::disabled();

        assert!(AgentRegistry::build(&config, &HeuristicResolver::new()).is_ok());
    }

    #[test]
    fn test_unresolvable_model_excludes_only_that_agent() {
        let config = AgentsConfig::default();
        let table = CapabilityTable::new()
            .with_capability(
                AgentKind::Causal,
                "models/causal_agent.pkl",
                Arc::new(ScriptedCapability::new(AgentResult::new(AgentKind::Causal))),
            )
            .with_capability(
                AgentKind::Theme,
                "models/theme_agent.pkl",
                Arc::new(ScriptedCapability::new(AgentResult::new(AgentKind::Theme))),
            );

        let registry = AgentRegistry::build(&config, &table).unwrap();

        assert_eq!(registry.kinds(), vec![AgentKind::Causal, AgentKind::Theme]);
        let unavailable: Vec<_> = registry.unavailable().iter().map(|u| u.kind).collect();
        assert_eq!(
            unavailable,
            vec![AgentKind::Character, AgentKind::Setting, AgentKind::Emotional]
        );
    }

    #[test]
    fn test_missing_model_path_is_not_fatal() {
        let mut config = AgentsConfig::default();
        config.causal.model_path = None;

        let registry = AgentRegistry::build(&config, &HeuristicResolver::new()).unwrap();
        assert!(registry.get(AgentKind::Causal).is_none());
        assert!(matches!(
            registry.unavailable()[0].reason,
            ConfigurationError::MissingModelPath { kind: AgentKind::Causal }
        ));
    }

    #[test]
    fn test_from_agents_orders_by_priority() {
        let agent = |params: AgentParams| {
            let kind = params.kind();
            Agent::new(
                params,
                "m",
                Duration::from_secs(1),
                Arc::new(ScriptedCapability::new(AgentResult::new(kind))),
            )
        };

        let registry = AgentRegistry::from_agents(vec![
            agent(AgentParams::Emotional {
                emotion_lexicon: "builtin".to_string(),
            }),
            agent(AgentParams::Causal { threshold: 0.5 }),
            agent(AgentParams::Causal { threshold: 0.9 }),
        ]);

        assert_eq!(registry.kinds(), vec![AgentKind::Causal, AgentKind::Emotional]);
        assert_eq!(
            registry.get(AgentKind::Causal).unwrap().params(),
            &AgentParams::Causal { threshold: 0.5 }
        );
    }
}
