//! Typed StoryStream configuration.
//!
//! The configuration is built once (from defaults, a TOML/JSON file, or code)
//! and passed by reference into every constructor. Missing top-level sections
//! and missing agent tables fall back to their defaults; a table that is
//! present is taken as written, so an agent table that omits its kind-specific
//! parameter does not silently inherit one.

mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::AgentKind;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "STORYSTREAM_CONFIG";

/// Configuration file used when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryStreamConfig {
    pub name: String,
    pub version: String,
    /// Run the bundled sample story on startup.
    pub demo_mode: bool,
    pub agents: AgentsConfig,
    pub knowledge_integration: KnowledgeIntegrationConfig,
    pub interface: InterfaceConfig,
    pub generation: GenerationConfig,
}

impl Default for StoryStreamConfig {
    fn default() -> Self {
        Self {
            name: "StoryStream".to_string(),
            version: "0.1.0".to_string(),
            demo_mode: true,
            agents: AgentsConfig::default(),
            knowledge_integration: KnowledgeIntegrationConfig::default(),
            interface: InterfaceConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl StoryStreamConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match format {
            ConfigFormat::Toml => Self::from_toml_str(&source),
            ConfigFormat::Json => Self::from_json_str(&source),
        }
    }

    /// Load from the file named by `STORYSTREAM_CONFIG` (or `config.toml`),
    /// using defaults when that file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write to a `.toml` or `.json` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check value ranges that the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            )));
        }

        let knowledge = &self.knowledge_integration;
        if knowledge.enabled {
            if knowledge.knowledge_base.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "knowledge_integration.knowledge_base must not be empty".to_string(),
                ));
            }
            if knowledge.embedding_dim == 0 {
                return Err(ConfigError::Invalid(
                    "knowledge_integration.embedding_dim must be greater than 0".to_string(),
                ));
            }
            if knowledge.batch_size == 0 {
                return Err(ConfigError::Invalid(
                    "knowledge_integration.batch_size must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Per-agent settings, one table per [`AgentKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub causal: AgentSettings,
    pub character: AgentSettings,
    pub setting: AgentSettings,
    pub theme: AgentSettings,
    pub emotional: AgentSettings,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            causal: AgentSettings::enabled("models/causal_agent.pkl").with_param("threshold", 0.75),
            character: AgentSettings::enabled("models/character_agent.pkl")
                .with_param("max_characters", 10),
            setting: AgentSettings::enabled("models/setting_agent.pkl")
                .with_param("default_timeline", "linear"),
            theme: AgentSettings::enabled("models/theme_agent.pkl")
                .with_param("theme_corpus", "data/themes.json"),
            emotional: AgentSettings::enabled("models/emotional_agent.pkl")
                .with_param("emotion_lexicon", "data/emotion_lexicon.json"),
        }
    }
}

impl AgentsConfig {
    /// Settings for one kind.
    pub fn get(&self, kind: AgentKind) -> &AgentSettings {
        match kind {
            AgentKind::Causal => &self.causal,
            AgentKind::Character => &self.character,
            AgentKind::Setting => &self.setting,
            AgentKind::Theme => &self.theme,
            AgentKind::Emotional => &self.emotional,
        }
    }

    /// Mutable settings for one kind.
    pub fn get_mut(&mut self, kind: AgentKind) -> &mut AgentSettings {
        match kind {
            AgentKind::Causal => &mut self.causal,
            AgentKind::Character => &mut self.character,
            AgentKind::Setting => &mut self.setting,
            AgentKind::Theme => &mut self.theme,
            AgentKind::Emotional => &mut self.emotional,
        }
    }

    /// All settings in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentKind, &AgentSettings)> {
        AgentKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Enable exactly the given kinds and disable the rest.
    pub fn enable_only(&mut self, kinds: &[AgentKind]) {
        for kind in AgentKind::ALL {
            self.get_mut(kind).enabled = kinds.contains(&kind);
        }
    }
}

/// Settings for a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub enabled: bool,

    /// Handle the capability resolver turns into an analysis capability.
    pub model_path: Option<String>,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Kind-specific parameters (threshold, max_characters, ...).
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
            timeout_ms: 10_000,
            params: BTreeMap::new(),
        }
    }
}

impl AgentSettings {
    /// Enabled settings backed by the given model handle.
    pub fn enabled(model_path: impl Into<String>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }

    /// Disabled settings.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set a kind-specific parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Knowledge base enrichment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeIntegrationConfig {
    pub enabled: bool,
    /// Handle of the knowledge store.
    pub knowledge_base: String,
    pub embedding_dim: usize,
    /// Keys per backend request.
    pub batch_size: usize,
    /// Timeout per backend request in milliseconds.
    pub timeout_ms: u64,
    /// Fail analysis when the knowledge backend is wholly unreachable.
    pub strict: bool,
}

impl Default for KnowledgeIntegrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            knowledge_base: "data/knowledge_base.json".to_string(),
            embedding_dim: 256,
            batch_size: 16,
            timeout_ms: 5_000,
            strict: false,
        }
    }
}

/// Front-end settings. Carried for the API/visualization layer; the core does not read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    pub api_enabled: bool,
    pub port: u16,
    pub visualization: bool,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            api_enabled: true,
            port: 8080,
            visualization: true,
        }
    }
}

/// Continuation generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    /// Upper bound on tokens requested from the generator.
    pub max_tokens: usize,
    /// Maximum prompt size in characters.
    pub context_budget_chars: usize,
    /// How many recently introduced characters go into the prompt.
    pub max_active_characters: usize,
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            context_budget_chars: 8_000,
            max_active_characters: 2,
            timeout_ms: 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoryStreamConfig::default();
        assert_eq!(config.name, "StoryStream");
        assert!(config.demo_mode);
        assert_eq!(config.agents.causal.param("threshold"), Some(&Value::from(0.75)));
        assert_eq!(config.agents.character.param("max_characters"), Some(&Value::from(10)));
        assert_eq!(config.knowledge_integration.embedding_dim, 256);
        assert_eq!(config.generation.model, "gpt-4");
        assert_eq!(config.generation.max_tokens, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = StoryStreamConfig::from_toml_str(
            r#"
            demo_mode = false

            [generation]
            temperature = 0.2

            [agents.theme]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(!config.demo_mode);
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.max_tokens, 1000);
        assert!(!config.agents.theme.enabled);
        assert!(config.agents.causal.enabled);
        assert_eq!(config.agents.setting.param("default_timeline"), Some(&Value::from("linear")));
    }

    #[test]
    fn test_agent_table_taken_as_written() {
        let config = StoryStreamConfig::from_toml_str(
            r#"
            [agents.causal]
            model_path = "models/other.pkl"
            "#,
        )
        .unwrap();

        assert!(config.agents.causal.enabled);
        assert_eq!(config.agents.causal.model_path.as_deref(), Some("models/other.pkl"));
        assert!(config.agents.causal.param("threshold").is_none());
    }

    #[test]
    fn test_flattened_params_from_json() {
        let config = StoryStreamConfig::from_json_str(
            r#"{"agents": {"character": {"enabled": true, "model_path": "m", "max_characters": 3}}}"#,
        )
        .unwrap();
        assert_eq!(config.agents.character.param("max_characters"), Some(&Value::from(3)));
    }

    #[test]
    fn test_enable_only() {
        let mut agents = AgentsConfig::default();
        agents.enable_only(&[AgentKind::Character, AgentKind::Setting]);

        let enabled: Vec<_> = agents
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(k, _)| k)
            .collect();
        assert_eq!(enabled, vec![AgentKind::Character, AgentKind::Setting]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StoryStreamConfig::default();
        config.generation.max_tokens = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = StoryStreamConfig::default();
        config.knowledge_integration.embedding_dim = 0;
        assert!(config.validate().is_err());

        // Knowledge settings are not checked when integration is off.
        config.knowledge_integration.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = StoryStreamConfig::load("config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_save_and_load_toml() {
        let path = std::env::temp_dir().join(format!("storystream-config-{}.toml", std::process::id()));

        let mut config = StoryStreamConfig::default();
        config.agents.emotional.enabled = false;
        config.save(&path).unwrap();

        let loaded = StoryStreamConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
