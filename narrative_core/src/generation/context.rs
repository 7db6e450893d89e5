//! Bounded prompt context assembled from a narrative model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use story_model::{GenerationConfig, NarrativeModel, TimelineMode};

/// Everything a continuation prompt is built from. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Most recently introduced characters, in document order.
    pub active_characters: Vec<CharacterContext>,

    pub active_setting: Option<SettingContext>,

    pub dominant_theme: Option<String>,

    /// Knowledge lines attached to the selected entities.
    pub relevant_facts: Vec<String>,

    /// The tail of the input text that fits the budget.
    pub story_text: String,

    /// The final prompt, never longer than the configured budget.
    pub prompt_text: String,

    /// Soft cap on continuation length in tokens; 0 means the configured maximum.
    pub target_length: usize,
}

/// Character context for the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterContext {
    pub name: String,
    pub traits: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

/// Setting context for the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingContext {
    pub location: Option<String>,
    pub timeline: Option<TimelineMode>,
}

impl GenerationContext {
    /// Select the active entities from `model` and fit `text` into
    /// the character budget, dropping the oldest text first.
    pub fn build(
        model: &NarrativeModel,
        text: &str,
        target_length: usize,
        config: &GenerationConfig,
    ) -> Self {
        let characters = model.most_recent_characters(config.max_active_characters);
        let location = model.setting.current_location();
        let theme = model.dominant_theme();

        let mut seen = HashSet::new();
        let relevant_facts: Vec<String> = characters
            .iter()
            .flat_map(|c| c.knowledge.iter())
            .chain(location.into_iter().flat_map(|l| l.knowledge.iter()))
            .chain(theme.into_iter().flat_map(|t| t.knowledge.iter()))
            .map(|entry| entry.describe())
            .filter(|fact| seen.insert(fact.clone()))
            .collect();

        let active_setting = (!model.setting.is_empty()).then(|| SettingContext {
            location: location.map(|l| l.name.clone()),
            timeline: model.setting.timeline,
        });

        let mut context = Self {
            active_characters: characters
                .iter()
                .rev()
                .map(|c| CharacterContext {
                    name: c.name.clone(),
                    traits: c.traits.iter().cloned().collect(),
                    attributes: c
                        .attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                })
                .collect(),
            active_setting,
            dominant_theme: theme.map(|t| t.label.clone()),
            relevant_facts,
            story_text: String::new(),
            prompt_text: String::new(),
            target_length,
        };
        context.fit(text.trim(), config.context_budget_chars);
        context
    }

    fn fit(&mut self, story: &str, budget: usize) {
        let mut frame = self.to_prompt_string().chars().count();
        if frame > budget && !self.relevant_facts.is_empty() {
            self.relevant_facts.clear();
            frame = self.to_prompt_string().chars().count();
        }

        if frame <= budget {
            self.story_text = keep_tail(story, budget - frame).to_string();
            self.prompt_text = self.to_prompt_string();
        } else {
            self.story_text = story.to_string();
            self.prompt_text = keep_tail(&self.to_prompt_string(), budget).to_string();
        }
    }

    /// Format the context as a prompt string.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        if !self.active_characters.is_empty() {
            prompt.push_str("## Characters\n");
            for character in &self.active_characters {
                prompt.push_str(&format!("- {}", character.name));
                let details: Vec<String> = character
                    .traits
                    .iter()
                    .cloned()
                    .chain(character.attributes.iter().map(|(k, v)| format!("{k}: {v}")))
                    .collect();
                if !details.is_empty() {
                    prompt.push_str(&format!(" ({})", details.join(", ")));
                }
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        if let Some(setting) = &self.active_setting {
            prompt.push_str("## Setting\n");
            prompt.push_str(setting.location.as_deref().unwrap_or("Unspecified location"));
            if let Some(timeline) = setting.timeline {
                prompt.push_str(&format!(" ({timeline} timeline)"));
            }
            prompt.push_str("\n\n");
        }

        if let Some(theme) = &self.dominant_theme {
            prompt.push_str(&format!("## Theme\n{theme}\n\n"));
        }

        if !self.relevant_facts.is_empty() {
            prompt.push_str("## Relevant Background\n");
            for fact in &self.relevant_facts {
                prompt.push_str(&format!("- {fact}\n"));
            }
            prompt.push('\n');
        }

        prompt.push_str("## Story So Far\n");
        prompt.push_str(&self.story_text);
        prompt.push_str("\n\n## Task\nContinue the story from where it stops.");
        if self.target_length > 0 {
            prompt.push_str(&format!(" Write about {} tokens.", self.target_length));
        }
        prompt.push('\n');

        prompt
    }
}

/// The last `max_chars` characters of `text`, without a partial leading word.
fn keep_tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(total - max_chars)
        .map_or(text.len(), |(i, _)| i);
    let (before, tail) = text.split_at(cut);

    let mid_word = !before.ends_with(char::is_whitespace) && !tail.starts_with(char::is_whitespace);
    let tail = match tail.find(char::is_whitespace) {
        Some(space) if mid_word => &tail[space..],
        _ => tail,
    };
    tail.trim_start()
}
