//! Causal graph - directed cause -> effect links between story nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::normalize_key;

/// An event node, unique by normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNode {
    /// Event text as first seen.
    pub text: String,
    pub first_mention: usize,
}

/// A directed edge. Endpoints are normalized keys of event nodes or characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEdge {
    pub cause: String,
    pub effect: String,
    pub strength: f32,
}

/// Directed graph of causal links.
///
/// The graph stores event nodes and edges. Whether an edge endpoint is a
/// registered node is checked by whoever builds the graph; edges may also
/// point at character keys, which live outside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CausalGraph {
    /// Event nodes by normalized text.
    nodes: BTreeMap<String, EventNode>,

    /// Edges in insertion order, unique by (cause, effect).
    edges: Vec<CausalEdge>,
}

impl CausalGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event node. The first registration of a key keeps its text.
    ///
    /// Returns the node key, or `None` when the text normalizes to nothing.
    pub fn add_event(&mut self, text: &str, offset: usize) -> Option<String> {
        let key = normalize_key(text);
        if key.is_empty() {
            return None;
        }
        self.nodes.entry(key.clone()).or_insert_with(|| EventNode {
            text: text.trim().to_string(),
            first_mention: offset,
        });
        Some(key)
    }

    /// Add an edge between two already-normalized keys.
    ///
    /// Returns `false` if the same (cause, effect) pair is already present;
    /// the existing edge keeps its strength.
    pub fn add_edge(&mut self, cause: String, effect: String, strength: f32) -> bool {
        if self
            .edges
            .iter()
            .any(|e| e.cause == cause && e.effect == effect)
        {
            return false;
        }
        self.edges.push(CausalEdge {
            cause,
            effect,
            strength,
        });
        true
    }

    /// Check if an event node exists.
    pub fn has_event(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Get an event node by key.
    pub fn get_event(&self, key: &str) -> Option<&EventNode> {
        self.nodes.get(key)
    }

    /// All event nodes by key.
    pub fn events(&self) -> impl Iterator<Item = (&String, &EventNode)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> &[CausalEdge] {
        &self.edges
    }

    /// Keys directly caused by `key`.
    pub fn effects_of(&self, key: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.cause == key)
            .map(|e| e.effect.as_str())
            .collect()
    }

    /// Keys that directly cause `key`.
    pub fn causes_of(&self, key: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.effect == key)
            .map(|e| e.cause.as_str())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
