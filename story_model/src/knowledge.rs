//! Knowledge base entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::clamp_unit;

/// Knowledge base entries grouped by normalized entity key.
pub type KnowledgeMap = BTreeMap<String, Vec<KnowledgeEntry>>;

/// One subject-relation-object fact retrieved from a knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub subject: String,
    pub relation: String,
    pub object: String,
    /// Confidence the store assigns to this fact (0.0 - 1.0).
    #[serde(default = "default_source_confidence")]
    pub source_confidence: f32,
}

fn default_source_confidence() -> f32 {
    1.0
}

impl KnowledgeEntry {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
            source_confidence: default_source_confidence(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.source_confidence = clamp_unit(confidence);
        self
    }

    /// Render as a single sentence-like line, e.g. "sea is_a body of water".
    pub fn describe(&self) -> String {
        format!("{} {} {}", self.subject, self.relation, self.object)
    }
}

impl std::fmt::Display for KnowledgeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults() {
        let entry = KnowledgeEntry::new("Elara", "is_a", "sailor");
        assert_eq!(entry.source_confidence, 1.0);
        assert_eq!(entry.to_string(), "Elara is_a sailor");
    }

    #[test]
    fn test_entry_deserialize_without_confidence() {
        let entry: KnowledgeEntry =
            serde_json::from_str(r#"{"subject":"sea","relation":"is_a","object":"body of water"}"#)
                .unwrap();
        assert_eq!(entry.source_confidence, 1.0);
        assert_eq!(entry.object, "body of water");
    }
}
