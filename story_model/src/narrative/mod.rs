//! The merged narrative model.
//!
//! A [`NarrativeModel`] is the single representation of one text produced by
//! merging every agent's output. It is built fresh per analysis and handed to
//! callers as an immutable snapshot.

mod causal;

pub use causal::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::clamp_unit;
use crate::knowledge::KnowledgeEntry;
use crate::normalize::normalize_key;

/// How story time flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimelineMode {
    #[default]
    Linear,
    NonLinear,
    Cyclical,
    Parallel,
}

impl TimelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineMode::Linear => "linear",
            TimelineMode::NonLinear => "non_linear",
            TimelineMode::Cyclical => "cyclical",
            TimelineMode::Parallel => "parallel",
        }
    }
}

impl std::fmt::Display for TimelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "linear" => Ok(TimelineMode::Linear),
            "non_linear" | "nonlinear" => Ok(TimelineMode::NonLinear),
            "cyclical" | "cyclic" => Ok(TimelineMode::Cyclical),
            "parallel" => Ok(TimelineMode::Parallel),
            other => Err(format!("unknown timeline mode '{}'", other)),
        }
    }
}

/// An emotion over a span of the source text.
///
/// Offsets are byte offsets; the span covers `start..end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
    /// Intensity (0.0 - 1.0).
    pub intensity: f32,
}

impl EmotionSpan {
    pub fn new(start: usize, end: usize, label: impl Into<String>, intensity: f32) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            label: label.into(),
            intensity: clamp_unit(intensity),
        }
    }

    /// Whether two spans share at least one byte.
    pub fn overlaps(&self, other: &EmotionSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Everything known about one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Display name as first seen.
    pub name: String,
    /// Normalized alternative names.
    pub aliases: BTreeSet<String>,
    pub traits: BTreeSet<String>,
    /// Scalar attributes; the first agent (in priority order) to set a key wins.
    pub attributes: BTreeMap<String, String>,
    /// Byte offset of the earliest mention.
    pub first_mention: usize,
    pub knowledge: Vec<KnowledgeEntry>,
}

impl CharacterProfile {
    pub fn new(name: impl Into<String>, first_mention: usize) -> Self {
        Self {
            name: name.into(),
            aliases: BTreeSet::new(),
            traits: BTreeSet::new(),
            attributes: BTreeMap::new(),
            first_mention,
            knowledge: Vec::new(),
        }
    }
}

/// A location in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationProfile {
    pub name: String,
    pub first_mention: usize,
    pub knowledge: Vec<KnowledgeEntry>,
}

/// Where and when the story takes place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Setting {
    pub timeline: Option<TimelineMode>,
    /// Locations keyed by normalized name.
    pub locations: BTreeMap<String, LocationProfile>,
}

impl Setting {
    pub fn has_location(&self, name: &str) -> bool {
        self.locations.contains_key(&normalize_key(name))
    }

    /// The most recently introduced location.
    pub fn current_location(&self) -> Option<&LocationProfile> {
        latest_by(self.locations.iter(), |l| l.first_mention)
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_none() && self.locations.is_empty()
    }
}

/// A theme and how strongly it is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeProfile {
    pub label: String,
    pub strength: f32,
    pub knowledge: Vec<KnowledgeEntry>,
}

/// The unified representation of one analyzed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NarrativeModel {
    pub causal_graph: CausalGraph,

    /// Characters keyed by normalized canonical name.
    pub characters: BTreeMap<String, CharacterProfile>,

    pub setting: Setting,

    /// Themes keyed by normalized label.
    pub themes: BTreeMap<String, ThemeProfile>,

    /// Emotion spans in document order, never overlapping.
    pub emotional_arc: Vec<EmotionSpan>,
}

impl NarrativeModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no dimension holds anything.
    pub fn is_empty(&self) -> bool {
        self.causal_graph.is_empty()
            && self.characters.is_empty()
            && self.setting.is_empty()
            && self.themes.is_empty()
            && self.emotional_arc.is_empty()
    }

    /// Find a character by name or alias.
    pub fn character(&self, name: &str) -> Option<&CharacterProfile> {
        let key = normalize_key(name);
        self.characters.get(&key).or_else(|| {
            self.characters
                .values()
                .find(|profile| profile.aliases.contains(&key))
        })
    }

    /// Up to `limit` characters, most recently introduced first.
    pub fn most_recent_characters(&self, limit: usize) -> Vec<&CharacterProfile> {
        let mut profiles: Vec<_> = self.characters.iter().collect();
        profiles.sort_by(|(ka, a), (kb, b)| {
            b.first_mention
                .cmp(&a.first_mention)
                .then_with(|| ka.cmp(kb))
        });
        profiles.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    /// The strongest theme. Ties go to the alphabetically first label.
    pub fn dominant_theme(&self) -> Option<&ThemeProfile> {
        self.themes
            .iter()
            .max_by(|(ka, a), (kb, b)| {
                a.strength
                    .partial_cmp(&b.strength)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| kb.cmp(ka))
            })
            .map(|(_, theme)| theme)
    }

    /// Keys of every entity knowledge can be attached to.
    pub fn entity_keys(&self) -> BTreeSet<String> {
        self.characters
            .keys()
            .chain(self.setting.locations.keys())
            .chain(self.themes.keys())
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for NarrativeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Characters ({}):", self.characters.len())?;
        for profile in self.most_recent_characters(usize::MAX).into_iter().rev() {
            write!(f, "  - {}", profile.name)?;
            if !profile.traits.is_empty() {
                let traits: Vec<_> = profile.traits.iter().map(String::as_str).collect();
                write!(f, " ({})", traits.join(", "))?;
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "Setting: timeline {}",
            self.setting
                .timeline
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )?;
        for location in self.setting.locations.values() {
            writeln!(f, "  - {}", location.name)?;
        }

        writeln!(f, "Themes ({}):", self.themes.len())?;
        for theme in self.themes.values() {
            writeln!(f, "  - {} ({:.2})", theme.label, theme.strength)?;
        }

        writeln!(
            f,
            "Causal graph: {} events, {} links",
            self.causal_graph.node_count(),
            self.causal_graph.edge_count()
        )?;

        write!(f, "Emotional arc:")?;
        if self.emotional_arc.is_empty() {
            write!(f, " none")?;
        }
        for span in &self.emotional_arc {
            write!(f, " {}({:.2})", span.label, span.intensity)?;
        }
        writeln!(f)
    }
}

/// Pick the item with the largest position; ties go to the smallest key.
fn latest_by<'a, T, F>(
    items: impl Iterator<Item = (&'a String, &'a T)>,
    position: F,
) -> Option<&'a T>
where
    T: 'a,
    F: Fn(&T) -> usize,
{
    items
        .max_by(|(ka, a), (kb, b)| position(*a).cmp(&position(*b)).then_with(|| kb.cmp(ka)))
        .map(|(_, item)| item)
}
