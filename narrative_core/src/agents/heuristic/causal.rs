//! Causal links between consecutive sentences, scored by connective markers.

use async_trait::async_trait;
use story_model::{AgentKind, AgentResult, CausalLink, EventMention};

use super::{contains_phrase, sentences};
use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;

/// Connectives that mark a sentence as a consequence of the one before it.
const CAUSAL_MARKERS: &[(&str, f64)] = &[
    ("as a result", 0.95),
    ("therefore", 0.9),
    ("consequently", 0.9),
    ("because of this", 0.9),
    ("thus", 0.85),
    ("so", 0.8),
    ("decided", 0.8),
    ("after", 0.6),
    ("then", 0.55),
    ("one day", 0.4),
];

/// Treats each sentence as an event and links it to the previous one when it
/// opens with or contains a causal connective whose weight meets `threshold`.
#[derive(Debug, Clone)]
pub struct CausalHeuristic {
    threshold: f64,
}

impl CausalHeuristic {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn marker_weight(sentence: &str) -> Option<f64> {
        let lowered: Vec<String> = super::words(sentence, 0)
            .iter()
            .map(|w| w.lower())
            .collect();

        CAUSAL_MARKERS
            .iter()
            .filter(|(marker, _)| contains_phrase(&lowered, marker))
            .map(|(_, weight)| *weight)
            .fold(None, |best: Option<f64>, w| Some(best.map_or(w, |b| b.max(w))))
    }
}

#[async_trait]
impl AnalysisCapability for CausalHeuristic {
    async fn analyze(&self, text: &str) -> Result<AgentResult, AgentExecutionError> {
        let sentences = sentences(text);
        let mut result = AgentResult::new(AgentKind::Causal);
        let mut strengths = Vec::new();

        for (i, sentence) in sentences.iter().enumerate() {
            result = result.with_entity(EventMention::new(sentence.body(), sentence.start));

            let Some(previous) = i.checked_sub(1).map(|p| sentences[p]) else {
                continue;
            };
            if let Some(weight) = Self::marker_weight(sentence.text) {
                if weight >= self.threshold {
                    strengths.push(weight);
                    result = result.with_entity(CausalLink::new(
                        previous.body(),
                        sentence.body(),
                        weight as f32,
                    ));
                }
            }
        }

        let confidence = if strengths.is_empty() {
            if sentences.is_empty() { 0.0 } else { 0.5 }
        } else {
            strengths.iter().sum::<f64>() / strengths.len() as f64
        };

        Ok(result
            .with_confidence(confidence as f32)
            .with_metadata("sentences", sentences.len())
            .with_metadata("links", strengths.len())
            .with_metadata("threshold", self.threshold))
    }

    fn name(&self) -> &str {
        "heuristic-causal"
    }
}

#[cfg(test)]
mod tests {
    use super::super::ELARA_STORY;
    use super::*;
    use story_model::Entity;

    fn links(result: &AgentResult) -> Vec<&CausalLink> {
        result
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::CausalLink(link) => Some(link),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_events_per_sentence() {
        let result = CausalHeuristic::new(0.75).analyze(ELARA_STORY).await.unwrap();
        let events = result
            .entities
            .iter()
            .filter(|e| matches!(e, Entity::Event(_)))
            .count();
        assert_eq!(events, 6);
    }

    #[tokio::test]
    async fn test_threshold_filters_links() {
        let strict = CausalHeuristic::new(0.75).analyze(ELARA_STORY).await.unwrap();
        let strict_links = links(&strict);
        assert_eq!(strict_links.len(), 1);
        assert!(strict_links[0].effect.contains("Elara decided to embark"));
        assert!(strict_links[0].cause.starts_with("The captain offered her"));

        let loose = CausalHeuristic::new(0.3).analyze(ELARA_STORY).await.unwrap();
        assert_eq!(links(&loose).len(), 2);
    }

    #[tokio::test]
    async fn test_first_sentence_never_an_effect() {
        let result = CausalHeuristic::new(0.0)
            .analyze("As a result, the town flooded. Therefore everyone left.")
            .await
            .unwrap();
        let found = links(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cause, "As a result, the town flooded");
    }
}
