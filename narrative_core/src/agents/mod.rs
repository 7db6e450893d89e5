//! Analysis agents.
//!
//! An agent is one of five fixed kinds wrapped around a pluggable
//! [`AnalysisCapability`]. The capability does the actual inference; the
//! [`Agent`] wrapper enforces the contract every kind must honor:
//! - empty input yields an empty result with confidence 0
//! - every call is bounded by the agent's timeout (or an earlier deadline)
//! - the result must be for the agent's own kind

pub mod heuristic;
mod registry;
mod resolver;

pub use registry::*;
pub use resolver::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use story_model::{AgentKind, AgentResult, AgentSettings, TimelineMode};
use tokio::time::Instant;

use crate::error::{AgentExecutionError, ConfigurationError};

/// A pluggable analysis capability.
///
/// Implementations must be pure functions of the input text and their own
/// configuration; the engine may call them concurrently.
#[async_trait]
pub trait AnalysisCapability: Send + Sync {
    /// Analyze a non-empty text.
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "capability"
    }
}

/// Typed kind-specific parameters. The variant determines the agent's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentParams {
    Causal { threshold: f64 },
    Character { max_characters: usize },
    Setting { default_timeline: TimelineMode },
    Theme { theme_corpus: String },
    Emotional { emotion_lexicon: String },
}

impl AgentParams {
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentParams::Causal { .. } => AgentKind::Causal,
            AgentParams::Character { .. } => AgentKind::Character,
            AgentParams::Setting { .. } => AgentKind::Setting,
            AgentParams::Theme { .. } => AgentKind::Theme,
            AgentParams::Emotional { .. } => AgentKind::Emotional,
        }
    }

    /// Read and check the parameters a kind requires.
    pub fn from_settings(
        kind: AgentKind,
        settings: &AgentSettings,
    ) -> Result<Self, ConfigurationError> {
        match kind {
            AgentKind::Causal => {
                let threshold = required(kind, settings, "threshold")?
                    .as_f64()
                    .ok_or_else(|| invalid(kind, "threshold", "expected a number"))?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(invalid(kind, "threshold", format!("{threshold} is outside [0, 1]")));
                }
                Ok(AgentParams::Causal { threshold })
            }
            AgentKind::Character => {
                let max_characters = required(kind, settings, "max_characters")?
                    .as_u64()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(kind, "max_characters", "expected a positive integer"))?;
                Ok(AgentParams::Character {
                    max_characters: max_characters as usize,
                })
            }
            AgentKind::Setting => {
                let default_timeline = required(kind, settings, "default_timeline")?
                    .as_str()
                    .ok_or_else(|| invalid(kind, "default_timeline", "expected a string"))?
                    .parse::<TimelineMode>()
                    .map_err(|reason| invalid(kind, "default_timeline", reason))?;
                Ok(AgentParams::Setting { default_timeline })
            }
            AgentKind::Theme => Ok(AgentParams::Theme {
                theme_corpus: required_string(kind, settings, "theme_corpus")?,
            }),
            AgentKind::Emotional => Ok(AgentParams::Emotional {
                emotion_lexicon: required_string(kind, settings, "emotion_lexicon")?,
            }),
        }
    }
}

fn required<'a>(
    kind: AgentKind,
    settings: &'a AgentSettings,
    param: &'static str,
) -> Result<&'a serde_json::Value, ConfigurationError> {
    settings
        .param(param)
        .ok_or(ConfigurationError::MissingParameter { kind, param })
}

fn required_string(
    kind: AgentKind,
    settings: &AgentSettings,
    param: &'static str,
) -> Result<String, ConfigurationError> {
    required(kind, settings, param)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid(kind, param, "expected a non-empty string"))
}

fn invalid(kind: AgentKind, param: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidParameter {
        kind,
        param,
        reason: reason.into(),
    }
}

/// An active agent: a kind, its parameters, and the capability behind it.
#[derive(Clone)]
pub struct Agent {
    params: AgentParams,
    model_path: String,
    timeout: Duration,
    capability: Arc<dyn AnalysisCapability>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("kind", &self.kind())
            .field("model_path", &self.model_path)
            .field("timeout", &self.timeout)
            .field("capability", &self.capability.name())
            .finish()
    }
}

impl Agent {
    pub fn new(
        params: AgentParams,
        model_path: impl Into<String>,
        timeout: Duration,
        capability: Arc<dyn AnalysisCapability>,
    ) -> Self {
        Self {
            params,
            model_path: model_path.into(),
            timeout,
            capability,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.params.kind()
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Analyze a text within the agent's own timeout.
    pub async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        self.analyze_until(text, None).await
    }

    /// Analyze a text, giving up at the agent timeout or `deadline`, whichever is first.
    pub async fn analyze_until(
        &self,
        text: &str,
        deadline: Option<Instant>,
    ) -> Result<AgentResult, AgentExecutionError> {
        let kind = self.kind();
        if text.trim().is_empty() {
            return Ok(AgentResult::empty(kind));
        }

        let started = Instant::now();
        let own_deadline = started + self.timeout;
        let deadline = deadline.map_or(own_deadline, |d| d.min(own_deadline));

        let result = tokio::time::timeout_at(deadline, self.capability.analyze(text))
            .await
            .map_err(|_| AgentExecutionError::Timeout {
                kind,
                after: started.elapsed(),
            })??;

        if result.agent_kind != kind {
            return Err(AgentExecutionError::KindMismatch {
                expected: kind,
                actual: result.agent_kind,
            });
        }

        let confidence = result.confidence;
        Ok(result.with_confidence(confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCapability;
    use story_model::ThemeLabel;

    fn theme_agent(capability: ScriptedCapability) -> Agent {
        Agent::new(
            AgentParams::Theme {
                theme_corpus: "builtin".to_string(),
            },
            "models/theme.pkl",
            Duration::from_millis(100),
            Arc::new(capability),
        )
    }

    #[test]
    fn test_params_from_default_settings() {
        let agents = story_model::AgentsConfig::default();
        for (kind, settings) in agents.iter() {
            let params = AgentParams::from_settings(kind, settings).unwrap();
            assert_eq!(params.kind(), kind);
        }
    }

    #[test]
    fn test_params_missing() {
        let settings = AgentSettings::enabled("models/causal.pkl");
        let err = AgentParams::from_settings(AgentKind::Causal, &settings).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingParameter { param: "threshold", .. }
        ));
    }

    #[test]
    fn test_params_invalid() {
        let settings = AgentSettings::enabled("m").with_param("threshold", 1.5);
        assert!(matches!(
            AgentParams::from_settings(AgentKind::Causal, &settings),
            Err(ConfigurationError::InvalidParameter { .. })
        ));

        let settings = AgentSettings::enabled("m").with_param("max_characters", 0);
        assert!(AgentParams::from_settings(AgentKind::Character, &settings).is_err());

        let settings = AgentSettings::enabled("m").with_param("default_timeline", "sideways");
        assert!(AgentParams::from_settings(AgentKind::Setting, &settings).is_err());

        let settings = AgentSettings::enabled("m").with_param("theme_corpus", "  ");
        assert!(AgentParams::from_settings(AgentKind::Theme, &settings).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_skips_capability() {
        let capability = ScriptedCapability::failing(AgentKind::Theme, "must not be called");
        let agent = theme_agent(capability);

        let result = agent.analyze("   ").await.unwrap();
        assert!(result.entities.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let capability = ScriptedCapability::new(AgentResult::new(AgentKind::Theme))
            .with_delay(Duration::from_secs(5));
        let agent = theme_agent(capability);

        let err = agent.analyze("A story.").await.unwrap_err();
        assert!(matches!(err, AgentExecutionError::Timeout { kind: AgentKind::Theme, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_shorter_than_timeout() {
        let capability = ScriptedCapability::new(AgentResult::new(AgentKind::Theme))
            .with_delay(Duration::from_millis(50));
        let agent = theme_agent(capability);

        let deadline = Instant::now() + Duration::from_millis(10);
        assert!(agent.analyze_until("A story.", Some(deadline)).await.is_err());
        assert!(agent.analyze("A story.").await.is_ok());
    }

    #[tokio::test]
    async fn test_kind_mismatch() {
        let capability = ScriptedCapability::new(AgentResult::new(AgentKind::Emotional));
        let agent = theme_agent(capability);

        let err = agent.analyze("A story.").await.unwrap_err();
        assert!(matches!(err, AgentExecutionError::KindMismatch { .. }));
    }

    #[tokio::test]
    async fn test_passes_result_through() {
        let expected = AgentResult::new(AgentKind::Theme)
            .with_entity(ThemeLabel::new("adventure", 0.8))
            .with_confidence(0.6);
        let agent = theme_agent(ScriptedCapability::new(expected.clone()));

        assert_eq!(agent.analyze("A story.").await.unwrap(), expected);
    }
}
