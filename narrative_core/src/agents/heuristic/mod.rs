//! Built-in lexicon and pattern capabilities.
//!
//! Small stand-ins for trained models: sentence-level
//! pattern matching over word lists. They exist so an engine can run end to
//! end without external inference backends.

mod causal;
mod character;
mod emotional;
mod setting;
mod theme;

pub use causal::CausalHeuristic;
pub use character::CharacterHeuristic;
pub use emotional::EmotionHeuristic;
pub use setting::SettingHeuristic;
pub use theme::ThemeHeuristic;

use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

use super::{AgentParams, AnalysisCapability};

/// Handle that selects the built-in word lists instead of a file.
pub const BUILTIN_LEXICON: &str = "builtin";

/// Build the heuristic capability for a parameter set.
pub fn build(params: &AgentParams) -> Result<Arc<dyn AnalysisCapability>, String> {
    let capability: Arc<dyn AnalysisCapability> = match params {
        AgentParams::Causal { threshold } => Arc::new(CausalHeuristic::new(*threshold)),
        AgentParams::Character { max_characters } => {
            Arc::new(CharacterHeuristic::new(*max_characters))
        }
        AgentParams::Setting { default_timeline } => {
            Arc::new(SettingHeuristic::new(*default_timeline))
        }
        AgentParams::Theme { theme_corpus } => Arc::new(ThemeHeuristic::from_corpus(theme_corpus)?),
        AgentParams::Emotional { emotion_lexicon } => {
            Arc::new(EmotionHeuristic::from_lexicon(emotion_lexicon)?)
        }
    };
    Ok(capability)
}

/// Read a JSON word list, or `None` for the built-in handle or a missing file.
fn load_word_list<T: DeserializeOwned>(handle: &str) -> Result<Option<T>, String> {
    let path = Path::new(handle);
    if handle == BUILTIN_LEXICON || !path.exists() {
        return Ok(None);
    }

    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&source)
        .map(Some)
        .map_err(|e| format!("failed to parse {}: {}", path.display(), e))
}

/// A sentence with its byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sentence<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl<'a> Sentence<'a> {
    /// Sentence text without its terminator.
    pub fn body(&self) -> &'a str {
        self.text.trim_end_matches(['.', '!', '?'])
    }

    pub fn words(&self) -> Vec<Word<'a>> {
        words(self.text, self.start)
    }
}

/// A word with its absolute byte offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Word<'a> {
    pub offset: usize,
    pub text: &'a str,
}

impl Word<'_> {
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Split a text into sentences ending in `.`, `!` or `?` followed by whitespace.
pub(crate) fn sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut result = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }

        if matches!(c, '.' | '!' | '?') {
            let at_break = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_break {
                if let Some(s) = start.take() {
                    let end = i + c.len_utf8();
                    result.push(Sentence {
                        start: s,
                        end,
                        text: &text[s..end],
                    });
                }
            }
        }
    }

    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            result.push(Sentence {
                start: s,
                end,
                text: &text[s..end],
            });
        }
    }

    result
}

/// Split into words: runs of alphanumerics with inner apostrophes/hyphens.
pub(crate) fn words(text: &str, base: usize) -> Vec<Word<'_>> {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '\'' || c == '-';
    let mut result = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        match (start, is_word_char(c)) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                let raw = &text[s..i];
                let trimmed = raw.trim_matches(['\'', '-']);
                if !trimmed.is_empty() {
                    let lead = raw.len() - raw.trim_start_matches(['\'', '-']).len();
                    result.push(Word {
                        offset: base + s + lead,
                        text: trimmed,
                    });
                }
                start = None;
            }
            _ => {}
        }
    }

    result
}

/// Whether the lowercase word sequence contains `phrase` as whole words.
pub(crate) fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

#[cfg(test)]
pub(crate) const ELARA_STORY: &str = "
        Once upon a time, there was a young woman named Elara who lived in a small village by the sea.
        She dreamed of exploring the world beyond the horizon. One day, a mysterious ship arrived at the harbor.
        The captain offered her a chance to join the crew. Despite her family's concerns, Elara decided to embark on the journey.
        At sea, she discovered she had a natural talent for navigation using the stars.
        ";
