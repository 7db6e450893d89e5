//! Locations from prepositional phrases and timeline from flashback cues.

use async_trait::async_trait;
use story_model::{normalize_key, AgentKind, AgentResult, SettingDescriptor, TimelineMode};

use super::{contains_phrase, sentences, Sentence};
use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;

const PLACE_PREPOSITIONS: &[&str] = &[
    "in", "at", "near", "inside", "within", "into", "toward", "towards",
];

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Words that end a place phrase.
const PHRASE_STOPS: &[&str] = &[
    "who", "which", "where", "when", "that", "and", "but", "while", "with", "to",
];

const MAX_PHRASE_WORDS: usize = 8;

const FLASHBACK_CUES: &[&str] = &[
    "years earlier",
    "years before",
    "flashback",
    "had once",
    "remembered",
];

#[derive(Debug, Clone)]
pub struct SettingHeuristic {
    default_timeline: TimelineMode,
}

impl SettingHeuristic {
    pub fn new(default_timeline: TimelineMode) -> Self {
        Self { default_timeline }
    }

    /// Place phrases of the form `<preposition> <article> <words...>` in one
    /// sentence, as `(phrase, offset)` with offsets into `text`.
    fn places<'a>(text: &'a str, sentence: &Sentence<'a>) -> Vec<(&'a str, usize)> {
        let words = sentence.words();
        let mut found = Vec::new();
        let mut i = 0;

        while i + 2 < words.len() {
            let is_place = PLACE_PREPOSITIONS.contains(&words[i].lower().as_str())
                && ARTICLES.contains(&words[i + 1].lower().as_str());
            if !is_place {
                i += 1;
                continue;
            }

            let article = i + 1;
            let mut last = article;
            while last + 1 < words.len() && last - article < MAX_PHRASE_WORDS {
                let next = &words[last + 1];
                let gap = &text[words[last].end()..next.offset];
                if !gap.trim().is_empty() || PHRASE_STOPS.contains(&next.lower().as_str()) {
                    break;
                }
                last += 1;
            }

            if last > article {
                let start = words[article].offset;
                found.push((&text[start..words[last].end()], start));
            }
            i = last + 1;
        }

        found
    }

    fn timeline(&self, text: &str) -> (TimelineMode, bool) {
        let lowered: Vec<String> = super::words(text, 0).iter().map(|w| w.lower()).collect();
        if FLASHBACK_CUES.iter().any(|cue| contains_phrase(&lowered, cue)) {
            (TimelineMode::NonLinear, true)
        } else {
            (self.default_timeline, false)
        }
    }
}

#[async_trait]
impl AnalysisCapability for SettingHeuristic {
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        let (timeline, cued) = self.timeline(text);
        let mut result = AgentResult::new(AgentKind::Setting)
            .with_entity(SettingDescriptor::timeline(timeline));

        let mut seen = std::collections::HashSet::new();
        let mut locations = 0usize;
        for sentence in sentences(text) {
            for (phrase, offset) in Self::places(text, &sentence) {
                if seen.insert(normalize_key(phrase)) {
                    locations += 1;
                    result = result.with_entity(SettingDescriptor::location(phrase, offset));
                }
            }
        }

        let confidence = match (locations > 0, cued) {
            (true, _) => 0.8,
            (false, true) => 0.6,
            (false, false) => 0.3,
        };

        Ok(result
            .with_confidence(confidence)
            .with_metadata("locations", locations)
            .with_metadata("timeline_cued", cued))
    }

    fn name(&self) -> &str {
        "heuristic-setting"
    }
}
