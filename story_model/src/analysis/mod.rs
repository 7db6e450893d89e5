//! Agent output definitions.
//!
//! Each analysis agent produces one [`AgentResult`] per text. The entities it
//! carries are raw, un-normalized observations; normalization and conflict
//! resolution happen when results are merged.

mod entity;

pub use entity::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five analysis dimensions.
///
/// Variant order is the canonical priority order: registries list agents in
/// this order and merges process results in this order. `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Causal,
    Character,
    Setting,
    Theme,
    Emotional,
}

impl AgentKind {
    /// All kinds in priority order.
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Causal,
        AgentKind::Character,
        AgentKind::Setting,
        AgentKind::Theme,
        AgentKind::Emotional,
    ];

    /// Configuration key for this kind (`agents.<key>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Causal => "causal",
            AgentKind::Character => "character",
            AgentKind::Setting => "setting",
            AgentKind::Theme => "theme",
            AgentKind::Emotional => "emotional",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown agent kind '{}'", s))
    }
}

/// Output of one agent for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_kind: AgentKind,

    /// Extracted items in the order the agent reported them.
    pub entities: Vec<Entity>,

    /// Overall confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Opaque diagnostics from the agent.
    #[serde(default)]
    pub raw_metadata: Map<String, Value>,
}

impl AgentResult {
    /// Create a result with no entities and full confidence.
    pub fn new(agent_kind: AgentKind) -> Self {
        Self {
            agent_kind,
            entities: Vec::new(),
            confidence: 1.0,
            raw_metadata: Map::new(),
        }
    }

    /// The result an agent returns for empty input: no entities, confidence 0.
    pub fn empty(agent_kind: AgentKind) -> Self {
        Self {
            confidence: 0.0,
            ..Self::new(agent_kind)
        }
    }

    /// Add an entity.
    pub fn with_entity(mut self, entity: impl Into<Entity>) -> Self {
        self.entities.push(entity.into());
        self
    }

    /// Add multiple entities.
    pub fn with_entities<E: Into<Entity>>(mut self, entities: impl IntoIterator<Item = E>) -> Self {
        self.entities.extend(entities.into_iter().map(Into::into));
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Attach a diagnostic value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw_metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_priority_order() {
        let mut kinds = vec![
            AgentKind::Emotional,
            AgentKind::Causal,
            AgentKind::Theme,
            AgentKind::Setting,
            AgentKind::Character,
        ];
        kinds.sort();
        assert_eq!(kinds, AgentKind::ALL.to_vec());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Character".parse::<AgentKind>(), Ok(AgentKind::Character));
        assert_eq!(" emotional ".parse::<AgentKind>(), Ok(AgentKind::Emotional));
        assert!("plot".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_result_builder() {
        let result = AgentResult::new(AgentKind::Theme)
            .with_entity(ThemeLabel::new("Adventure", 0.8))
            .with_confidence(1.7)
            .with_metadata("model", "lexicon");

        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.raw_metadata["model"], "lexicon");
    }

    #[test]
    fn test_empty_result() {
        let result = AgentResult::empty(AgentKind::Causal);
        assert!(result.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_nan_confidence_clamps_to_zero() {
        let result = AgentResult::new(AgentKind::Causal).with_confidence(f32::NAN);
        assert_eq!(result.confidence, 0.0);
    }
}
