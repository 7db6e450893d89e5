//! Character detection from naming cues and capitalized words.

use async_trait::async_trait;
use std::collections::HashMap;
use story_model::{normalize_key, AgentKind, AgentResult, CharacterMention};

use super::{sentences, Word};
use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;

const NAMING_CUES: &[&str] = &["named", "called"];

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Capitalized words that are not names.
const NON_NAMES: &[&str] = &[
    "i", "once", "one", "the", "a", "an", "she", "he", "they", "it", "we", "you", "her", "his",
    "their", "but", "and", "then", "when", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december", "god", "mr", "mrs", "ms", "dr",
];

/// Finds characters introduced with "named X" / "called X" (collecting the
/// descriptive words before the cue as traits) and capitalized words that do
/// not start a sentence. Keeps at most `max_characters`, earliest first.
#[derive(Debug, Clone)]
pub struct CharacterHeuristic {
    max_characters: usize,
}

impl CharacterHeuristic {
    pub fn new(max_characters: usize) -> Self {
        Self { max_characters }
    }

    /// Consecutive capitalized words starting at `start`, joined as a name.
    fn name_at(words: &[Word<'_>], start: usize) -> Option<(String, usize)> {
        let taken: Vec<&str> = words[start..]
            .iter()
            .take_while(|w| w.is_capitalized() && !NON_NAMES.contains(&w.lower().as_str()))
            .map(|w| w.text)
            .collect();

        if taken.is_empty() {
            None
        } else {
            Some((taken.join(" "), taken.len()))
        }
    }

    /// Words between the nearest preceding article and the naming cue.
    fn descriptors(words: &[Word<'_>], cue: usize) -> Vec<String> {
        let window_start = cue.saturating_sub(4);
        let Some(article) = (window_start..cue)
            .rev()
            .find(|&i| ARTICLES.contains(&words[i].lower().as_str()))
        else {
            return Vec::new();
        };

        words[article + 1..cue].iter().map(|w| w.lower()).collect()
    }
}

#[async_trait]
impl AnalysisCapability for CharacterHeuristic {
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        let mut found: Vec<CharacterMention> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut cued = 0usize;

        for sentence in sentences(text) {
            let words = sentence.words();
            let mut i = 1;

            while i < words.len() {
                let lower = words[i].lower();
                let (mention, consumed) = if NAMING_CUES.contains(&lower.as_str()) && i + 1 < words.len() {
                    match Self::name_at(&words, i + 1) {
                        Some((name, len)) => {
                            let mut mention = CharacterMention::new(name, words[i + 1].offset);
                            let mut descriptors = Self::descriptors(&words, i);
                            if let Some(noun) = descriptors.pop() {
                                mention = mention.with_attribute("kind", noun);
                            }
                            for descriptor in descriptors {
                                mention = mention.with_trait(descriptor);
                            }
                            cued += 1;
                            (Some(mention), len + 1)
                        }
                        None => (None, 1),
                    }
                } else if words[i].is_capitalized() {
                    match Self::name_at(&words, i) {
                        Some((name, len)) => (Some(CharacterMention::new(name, words[i].offset)), len),
                        None => (None, 1),
                    }
                } else {
                    (None, 1)
                };

                if let Some(mention) = mention {
                    let key = normalize_key(&mention.name);
                    match index.get(&key) {
                        Some(&existing) => {
                            let entry = &mut found[existing];
                            entry.traits.extend(mention.traits);
                            for (k, v) in mention.attributes {
                                entry.attributes.entry(k).or_insert(v);
                            }
                        }
                        None => {
                            index.insert(key, found.len());
                            found.push(mention);
                        }
                    }
                }
                i += consumed;
            }
        }

        found.sort_by_key(|m| m.offset);
        let detected = found.len();
        found.truncate(self.max_characters);

        let confidence = match (found.is_empty(), cued > 0) {
            (true, _) => 0.0,
            (false, true) => 0.9,
            (false, false) => 0.6,
        };

        Ok(AgentResult::new(AgentKind::Character)
            .with_entities(found)
            .with_confidence(confidence)
            .with_metadata("detected", detected)
            .with_metadata("max_characters", self.max_characters))
    }

    fn name(&self) -> &str {
        "heuristic-character"
    }
}
