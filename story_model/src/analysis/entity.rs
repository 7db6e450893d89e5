//! Entities extracted by agents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::clamp_unit;
use crate::narrative::{EmotionSpan, TimelineMode};

/// One item extracted from a text.
///
/// Any agent may report any variant; which dimension of the merged model an
/// entity lands in is decided by its variant, not by the agent that found it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    /// An event node for the causal graph.
    Event(EventMention),
    /// A directed cause -> effect link between events or characters.
    CausalLink(CausalLink),
    Character(CharacterMention),
    Setting(SettingDescriptor),
    Theme(ThemeLabel),
    Emotion(EmotionSpan),
}

/// An event described in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMention {
    pub text: String,
    /// Byte offset of the event in the source text.
    pub offset: usize,
}

impl EventMention {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            offset,
        }
    }
}

/// A causal link. Endpoints are raw references to event text or character names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalLink {
    pub cause: String,
    pub effect: String,
    /// Link strength (0.0 - 1.0).
    pub strength: f32,
}

impl CausalLink {
    pub fn new(cause: impl Into<String>, effect: impl Into<String>, strength: f32) -> Self {
        Self {
            cause: cause.into(),
            effect: effect.into(),
            strength: clamp_unit(strength),
        }
    }
}

/// A mention of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMention {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Free-form traits, e.g. "young", "curious".
    #[serde(default)]
    pub traits: Vec<String>,
    /// Scalar attributes, e.g. "role" -> "navigator".
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Byte offset of this mention in the source text.
    pub offset: usize,
}

impl CharacterMention {
    pub fn new(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            traits: Vec::new(),
            attributes: BTreeMap::new(),
            offset,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_trait(mut self, trait_name: impl Into<String>) -> Self {
        self.traits.push(trait_name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A setting observation: a location, a timeline mode, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDescriptor {
    pub location: Option<String>,
    pub timeline: Option<TimelineMode>,
    pub offset: usize,
}

impl SettingDescriptor {
    pub fn location(name: impl Into<String>, offset: usize) -> Self {
        Self {
            location: Some(name.into()),
            timeline: None,
            offset,
        }
    }

    pub fn timeline(mode: TimelineMode) -> Self {
        Self {
            location: None,
            timeline: Some(mode),
            offset: 0,
        }
    }

    pub fn with_timeline(mut self, mode: TimelineMode) -> Self {
        self.timeline = Some(mode);
        self
    }
}

/// A theme with its strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeLabel {
    pub label: String,
    pub strength: f32,
}

impl ThemeLabel {
    pub fn new(label: impl Into<String>, strength: f32) -> Self {
        Self {
            label: label.into(),
            strength: clamp_unit(strength),
        }
    }
}

macro_rules! impl_into_entity {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

impl_into_entity! {
    EventMention => Event,
    CausalLink => CausalLink,
    CharacterMention => Character,
    SettingDescriptor => Setting,
    ThemeLabel => Theme,
    EmotionSpan => Emotion,
}
