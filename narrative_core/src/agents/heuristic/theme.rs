//! Keyword-corpus theme detection.

use async_trait::async_trait;
use std::collections::BTreeMap;
use story_model::{AgentKind, AgentResult, ThemeLabel};

use super::load_word_list;
use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;

/// Theme label to keywords.
pub type ThemeCorpus = BTreeMap<String, Vec<String>>;

const BUILTIN_CORPUS: &[(&str, &[&str])] = &[
    (
        "adventure",
        &[
            "adventure", "journey", "voyage", "explore", "exploring", "explored", "ship", "sea",
            "horizon", "embark", "crew", "quest", "sail", "sailed", "navigation",
        ],
    ),
    (
        "family",
        &["family", "family's", "mother", "father", "sister", "brother", "home", "parents"],
    ),
    ("love", &["love", "loved", "heart", "kiss", "beloved", "romance"]),
    ("loss", &["death", "died", "grief", "lost", "mourning", "funeral", "gone"]),
    (
        "ambition",
        &["dream", "dreamed", "dreams", "ambition", "chance", "talent", "goal", "destiny"],
    ),
    ("freedom", &["free", "freedom", "escape", "escaped", "beyond", "released"]),
    ("conflict", &["war", "battle", "fight", "fought", "enemy", "betrayal", "betrayed"]),
];

/// Scores each theme by how many of its keywords occur in the text.
#[derive(Debug, Clone)]
pub struct ThemeHeuristic {
    corpus: ThemeCorpus,
}

impl ThemeHeuristic {
    pub fn new(corpus: ThemeCorpus) -> Self {
        Self { corpus }
    }

    pub fn builtin() -> Self {
        let corpus = BUILTIN_CORPUS
            .iter()
            .map(|(label, words)| {
                (label.to_string(), words.iter().map(|w| w.to_string()).collect())
            })
            .collect();
        Self::new(corpus)
    }

    /// Load a corpus from a JSON file (`{"label": ["keyword", ...]}`), or
    /// use the built-in one.
    pub fn from_corpus(handle: &str) -> Result<Self, String> {
        match load_word_list::<ThemeCorpus>(handle)? {
            Some(corpus) if corpus.is_empty() => Err(format!("theme corpus {handle} is empty")),
            Some(corpus) => Ok(Self::new(corpus)),
            None => Ok(Self::builtin()),
        }
    }

    /// Keyword hits per theme, for themes with at least one hit.
    fn hits(&self, text: &str) -> Vec<(&str, usize)> {
        let words: Vec<String> = super::words(text, 0).iter().map(|w| w.lower()).collect();

        self.corpus
            .iter()
            .map(|(label, keywords)| {
                let hits = words
                    .iter()
                    .filter(|w| keywords.iter().any(|k| k.eq_ignore_ascii_case(w)))
                    .count();
                (label.as_str(), hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect()
    }
}

#[async_trait]
impl AnalysisCapability for ThemeHeuristic {
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        let mut scored: Vec<ThemeLabel> = self
            .hits(text)
            .into_iter()
            .map(|(label, hits)| ThemeLabel::new(label, hits as f32 / (hits as f32 + 2.0)))
            .collect();
        scored.sort_by(|a, b| b.strength.total_cmp(&a.strength).then_with(|| a.label.cmp(&b.label)));

        let confidence = scored.first().map_or(0.0, |t| t.strength);
        let themes = scored.len();

        Ok(AgentResult::new(AgentKind::Theme)
            .with_entities(scored)
            .with_confidence(confidence)
            .with_metadata("themes", themes)
            .with_metadata("corpus_size", self.corpus.len()))
    }

    fn name(&self) -> &str {
        "heuristic-theme"
    }
}
