//! Narrative Merger - combines agent results into one [`NarrativeModel`].
//!
//! The merge works in three passes over results sorted by agent kind:
//! 1. **Register**: events, characters, locations and themes are keyed by
//!    normalized name; the first kind to set a scalar value keeps it
//! 2. **Link**: causal links are added only when both endpoints resolve to a
//!    registered event or character; the rest are dropped
//! 3. **Attach**: knowledge entries are copied onto matching entities
//!
//! Emotion spans are then sorted and de-overlapped (see [`resolve_overlaps`]).

mod emotional_arc;

pub use emotional_arc::resolve_overlaps;

use std::collections::HashMap;
use story_model::{
    normalize_key, AgentResult, CausalLink, CharacterMention, CharacterProfile, Entity,
    KnowledgeMap, LocationProfile, NarrativeModel, SettingDescriptor, ThemeLabel, ThemeProfile,
};
use tracing::debug;

/// What the merge had to discard to keep the model consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Causal links with an endpoint no agent registered.
    pub dropped_edges: usize,
    /// Emotion spans lost to overlap resolution or empty ranges.
    pub dropped_spans: usize,
}

/// Deterministic merger of agent results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeMerger;

impl NarrativeMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, results: Vec<AgentResult>, knowledge: Option<&KnowledgeMap>) -> NarrativeModel {
        self.merge_with_report(results, knowledge).0
    }

    /// Merge and report what was dropped.
    ///
    /// The output depends only on the set of results, never on their order
    /// in `results`: they are re-sorted by kind priority first.
    pub fn merge_with_report(
        &self,
        mut results: Vec<AgentResult>,
        knowledge: Option<&KnowledgeMap>,
    ) -> (NarrativeModel, MergeReport) {
        results.sort_by_key(|r| r.agent_kind);

        let mut state = MergeState::default();
        let mut links = Vec::new();
        let mut spans = Vec::new();

        for result in results {
            for entity in result.entities {
                match entity {
                    Entity::Event(event) => {
                        state.model.causal_graph.add_event(&event.text, event.offset);
                    }
                    Entity::Character(mention) => state.register_character(mention),
                    Entity::Setting(descriptor) => state.register_setting(descriptor),
                    Entity::Theme(theme) => state.register_theme(theme),
                    Entity::CausalLink(link) => links.push(link),
                    Entity::Emotion(span) => spans.push(span),
                }
            }
        }

        let mut report = MergeReport::default();
        for link in links {
            if !state.link(&link) {
                debug!(
                    cause = %link.cause,
                    effect = %link.effect,
                    "dropping causal edge with unregistered endpoint"
                );
                report.dropped_edges += 1;
            }
        }

        let mut model = state.model;
        if let Some(knowledge) = knowledge {
            self.attach_knowledge(&mut model, knowledge);
        }

        let (arc, dropped_spans) = resolve_overlaps(spans);
        model.emotional_arc = arc;
        report.dropped_spans = dropped_spans;

        (model, report)
    }

    /// Copy knowledge entries onto characters, locations and themes with a
    /// matching key. Entries under unknown keys are ignored.
    pub fn attach_knowledge(&self, model: &mut NarrativeModel, knowledge: &KnowledgeMap) {
        for (key, profile) in model.characters.iter_mut() {
            if let Some(entries) = knowledge.get(key) {
                profile.knowledge = entries.clone();
            }
        }
        for (key, location) in model.setting.locations.iter_mut() {
            if let Some(entries) = knowledge.get(key) {
                location.knowledge = entries.clone();
            }
        }
        for (key, theme) in model.themes.iter_mut() {
            if let Some(entries) = knowledge.get(key) {
                theme.knowledge = entries.clone();
            }
        }
    }
}

#[derive(Default)]
struct MergeState {
    model: NarrativeModel,
    /// Alias key -> canonical character key.
    aliases: HashMap<String, String>,
}

impl MergeState {
    fn canonical_character(&self, key: &str) -> Option<String> {
        if self.model.characters.contains_key(key) {
            Some(key.to_string())
        } else {
            self.aliases.get(key).cloned()
        }
    }

    fn register_character(&mut self, mention: CharacterMention) {
        let key = normalize_key(&mention.name);
        if key.is_empty() {
            return;
        }

        let alias_keys: Vec<String> = mention
            .aliases
            .iter()
            .map(|alias| normalize_key(alias))
            .filter(|alias_key| !alias_key.is_empty())
            .collect();

        // A mention known under one of its aliases joins that character, and
        // its own name becomes another alias.
        let existing = self.canonical_character(&key).or_else(|| {
            alias_keys
                .iter()
                .find_map(|alias_key| self.canonical_character(alias_key))
        });
        let canonical = match existing {
            Some(canonical) => canonical,
            None => {
                self.model.characters.insert(
                    key.clone(),
                    CharacterProfile::new(mention.name.trim(), mention.offset),
                );
                key.clone()
            }
        };

        let mut new_aliases = Vec::new();
        for alias_key in std::iter::once(key).chain(alias_keys) {
            let taken = alias_key == canonical
                || self.model.characters.contains_key(&alias_key)
                || self.aliases.contains_key(&alias_key);
            if !taken {
                self.aliases.insert(alias_key.clone(), canonical.clone());
                new_aliases.push(alias_key);
            }
        }

        let Some(profile) = self.model.characters.get_mut(&canonical) else {
            return;
        };
        profile.first_mention = profile.first_mention.min(mention.offset);
        profile.aliases.extend(new_aliases);
        profile.traits.extend(
            mention
                .traits
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        );
        for (name, value) in mention.attributes {
            profile.attributes.entry(name).or_insert(value);
        }
    }

    fn register_setting(&mut self, descriptor: SettingDescriptor) {
        let setting = &mut self.model.setting;
        if let Some(timeline) = descriptor.timeline {
            setting.timeline.get_or_insert(timeline);
        }

        let Some(name) = descriptor.location else {
            return;
        };
        let key = normalize_key(&name);
        if key.is_empty() {
            return;
        }
        setting
            .locations
            .entry(key)
            .and_modify(|l| l.first_mention = l.first_mention.min(descriptor.offset))
            .or_insert_with(|| LocationProfile {
                name: name.trim().to_string(),
                first_mention: descriptor.offset,
                knowledge: Vec::new(),
            });
    }

    fn register_theme(&mut self, theme: ThemeLabel) {
        let key = normalize_key(&theme.label);
        if key.is_empty() {
            return;
        }
        self.model.themes.entry(key).or_insert_with(|| ThemeProfile {
            label: theme.label.trim().to_string(),
            strength: theme.strength,
            knowledge: Vec::new(),
        });
    }

    /// Resolve a link endpoint to an event key or canonical character key.
    fn endpoint(&self, text: &str) -> Option<String> {
        let key = normalize_key(text);
        if key.is_empty() {
            return None;
        }
        if self.model.causal_graph.has_event(&key) {
            return Some(key);
        }
        self.canonical_character(&key)
    }

    fn link(&mut self, link: &CausalLink) -> bool {
        match (self.endpoint(&link.cause), self.endpoint(&link.effect)) {
            (Some(cause), Some(effect)) => {
                self.model.causal_graph.add_edge(cause, effect, link.strength);
                true
            }
            _ => false,
        }
    }
}
