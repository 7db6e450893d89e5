//! Lexicon-based sentence emotions.

use async_trait::async_trait;
use std::collections::BTreeMap;
use story_model::{AgentKind, AgentResult, EmotionSpan};

use super::{load_word_list, sentences};
use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;

/// Emotion label to word weights.
pub type EmotionLexicon = BTreeMap<String, BTreeMap<String, f32>>;

const BUILTIN_EMOTIONS: &[(&str, &[(&str, f32)])] = &[
    (
        "joy",
        &[("happy", 0.7), ("joy", 0.8), ("delighted", 0.8), ("laughed", 0.6), ("smiled", 0.5), ("celebrated", 0.7)],
    ),
    (
        "fear",
        &[("afraid", 0.7), ("fear", 0.8), ("terrified", 0.9), ("storm", 0.4), ("dark", 0.3), ("mysterious", 0.45)],
    ),
    (
        "sadness",
        &[("sad", 0.7), ("wept", 0.8), ("grief", 0.9), ("lonely", 0.6), ("lost", 0.5)],
    ),
    (
        "anger",
        &[("angry", 0.8), ("furious", 0.9), ("rage", 0.9), ("shouted", 0.5)],
    ),
    (
        "hope",
        &[("dreamed", 0.6), ("hope", 0.7), ("hoped", 0.7), ("chance", 0.5), ("wish", 0.5)],
    ),
    (
        "anticipation",
        &[("journey", 0.5), ("embark", 0.65), ("adventure", 0.6), ("discovered", 0.55)],
    ),
    (
        "worry",
        &[("concerns", 0.5), ("worried", 0.6), ("anxious", 0.7), ("uneasy", 0.5)],
    ),
];

/// Labels each sentence with the strongest emotion word it contains.
#[derive(Debug, Clone)]
pub struct EmotionHeuristic {
    lexicon: EmotionLexicon,
}

impl EmotionHeuristic {
    /// Lexicon words are matched against lowercased text, so they are
    /// lowercased here.
    pub fn new(lexicon: EmotionLexicon) -> Self {
        let lexicon = lexicon
            .into_iter()
            .map(|(label, weights)| {
                let weights = weights
                    .into_iter()
                    .map(|(word, weight)| (word.trim().to_lowercase(), weight))
                    .collect();
                (label, weights)
            })
            .collect();
        Self { lexicon }
    }

    pub fn builtin() -> Self {
        let lexicon = BUILTIN_EMOTIONS
            .iter()
            .map(|(label, words)| {
                let weights = words.iter().map(|(w, v)| (w.to_string(), *v)).collect();
                (label.to_string(), weights)
            })
            .collect();
        Self::new(lexicon)
    }

    /// Load a lexicon from a JSON file (`{"label": {"word": weight}}`), or
    /// use the built-in one.
    pub fn from_lexicon(handle: &str) -> Result<Self, String> {
        match load_word_list::<EmotionLexicon>(handle)? {
            Some(lexicon) if lexicon.is_empty() => Err(format!("emotion lexicon {handle} is empty")),
            Some(lexicon) => Ok(Self::new(lexicon)),
            None => Ok(Self::builtin()),
        }
    }

    fn strongest(&self, words: &[String]) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (label, weights) in &self.lexicon {
            for word in words {
                if let Some(&weight) = weights.get(word) {
                    if best.map_or(true, |(_, b)| weight > b) {
                        best = Some((label.as_str(), weight));
                    }
                }
            }
        }
        best
    }
}

#[async_trait]
impl AnalysisCapability for EmotionHeuristic {
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        let all = sentences(text);
        let mut spans = Vec::new();

        for sentence in &all {
            let words: Vec<String> = sentence.words().iter().map(|w| w.lower()).collect();
            if let Some((label, weight)) = self.strongest(&words) {
                spans.push(EmotionSpan::new(sentence.start, sentence.end, label, weight));
            }
        }

        let coverage = if all.is_empty() {
            0.0
        } else {
            spans.len() as f32 / all.len() as f32
        };

        Ok(AgentResult::new(AgentKind::Emotional)
            .with_metadata("sentences", all.len())
            .with_metadata("spans", spans.len())
            .with_entities(spans)
            .with_confidence(coverage))
    }

    fn name(&self) -> &str {
        "heuristic-emotional"
    }
}

#[cfg(test)]
mod tests {
    use super::super::ELARA_STORY;
    use super::*;
    use story_model::Entity;

    fn spans(result: &AgentResult) -> Vec<&EmotionSpan> {
        result
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::Emotion(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_elara_arc() {
        let result = EmotionHeuristic::builtin().analyze(ELARA_STORY).await.unwrap();
        let found = spans(&result);
        let labels: Vec<_> = found.iter().map(|s| s.label.as_str()).collect();

        assert_eq!(labels, vec!["hope", "fear", "hope", "anticipation", "anticipation"]);
        assert!(found.windows(2).all(|w| w[0].end <= w[1].start));
        assert_eq!(&ELARA_STORY[found[0].start..found[0].start + 3], "She");
    }

    #[tokio::test]
    async fn test_custom_lexicon() {
        let lexicon = EmotionLexicon::from([(
            "calm".to_string(),
            BTreeMap::from([("quiet".to_string(), 0.4), ("still".to_string(), 0.6)]),
        )]);
        let result = EmotionHeuristic::new(lexicon)
            .analyze("The lake was quiet and still. Nothing else.")
            .await
            .unwrap();
        let found = spans(&result);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label, "calm");
        assert_eq!(found[0].intensity, 0.6);
        assert_eq!((found[0].start, found[0].end), (0, 29));
        assert_eq!(result.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_lexicon_file_words_match_any_case() {
        let path = std::env::temp_dir().join(format!("emotions-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"joy": {"Happy": 0.8, "GLAD": 0.5}}"#).unwrap();

        let heuristic = EmotionHeuristic::from_lexicon(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let result = heuristic.analyze("She was happy. He was Glad.").await.unwrap();
        let found = spans(&result);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.label == "joy"));
        assert_eq!(found[0].intensity, 0.8);
        assert_eq!(found[1].intensity, 0.5);
    }
}
