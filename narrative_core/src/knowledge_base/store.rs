//! In-memory knowledge store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use story_model::{normalize_key, KnowledgeEntry};
use thiserror::Error;
use uuid::Uuid;

use super::{KeyLookup, KnowledgeBackend, KnowledgeBackendError};

/// Unique identifier for a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to load a store from disk.
#[derive(Debug, Error)]
pub enum KnowledgeLoadError {
    #[error("failed to read knowledge base {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse knowledge base: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Facts stored by ID and indexed by normalized subject.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    entries: HashMap<EntryId, KnowledgeEntry>,

    /// Index: subject key -> entries in insertion order.
    by_subject: HashMap<String, Vec<EntryId>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = KnowledgeEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.add(entry);
        }
        store
    }

    /// Parse a JSON array of entries.
    pub fn from_json_str(source: &str) -> Result<Self, KnowledgeLoadError> {
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(source)?;
        Ok(Self::from_entries(entries))
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, KnowledgeLoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| KnowledgeLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    /// Add a fact. Returns its ID for later removal.
    pub fn add(&mut self, entry: KnowledgeEntry) -> EntryId {
        let id = EntryId::new();
        self.by_subject
            .entry(normalize_key(&entry.subject))
            .or_default()
            .push(id);
        self.entries.insert(id, entry);
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Option<KnowledgeEntry> {
        let entry = self.entries.remove(&id)?;
        let key = normalize_key(&entry.subject);
        if let Some(ids) = self.by_subject.get_mut(&key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_subject.remove(&key);
            }
        }
        Some(entry)
    }

    pub fn get(&self, id: EntryId) -> Option<&KnowledgeEntry> {
        self.entries.get(&id)
    }

    /// Entries whose subject normalizes to the same key as `subject`.
    pub fn entries_for(&self, subject: &str) -> Vec<&KnowledgeEntry> {
        self.by_subject
            .get(&normalize_key(subject))
            .map(|ids| ids.iter().filter_map(|id| self.entries.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.by_subject.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KnowledgeBackend for InMemoryKnowledgeBase {
    async fn lookup(&self, key: &str) -> Result<Vec<KnowledgeEntry>, KnowledgeBackendError> {
        Ok(self.entries_for(key).into_iter().cloned().collect())
    }

    async fn lookup_batch(&self, keys: &[String]) -> Vec<KeyLookup> {
        keys.iter()
            .map(|key| {
                let found = self.entries_for(key).into_iter().cloned().collect();
                (key.clone(), Ok(found))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
