//! Fail-soft knowledge lookups for discovered entity keys.

use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use story_model::{KnowledgeIntegrationConfig, KnowledgeMap};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::KnowledgeBackend;
use crate::error::KnowledgeUnavailableError;

/// Entries found for a set of keys, with per-key bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeLookup {
    /// Entries for keys that had at least one fact.
    pub entries: KnowledgeMap,
    /// Keys the backend answered, including misses.
    pub resolved: usize,
    /// Keys that errored or timed out.
    pub failed: usize,
}

impl KnowledgeLookup {
    pub fn attempted(&self) -> usize {
        self.resolved + self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Queries a [`KnowledgeBackend`] for entity keys.
///
/// Keys are split into chunks of `batch_size`; chunks run concurrently, each
/// under its own timeout. A failure only costs the keys it touched.
#[derive(Clone)]
pub struct KnowledgeIntegrator {
    backend: Arc<dyn KnowledgeBackend>,
    batch_size: usize,
    timeout: Duration,
}

impl std::fmt::Debug for KnowledgeIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIntegrator")
            .field("backend", &self.backend.name())
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl KnowledgeIntegrator {
    pub fn new(backend: Arc<dyn KnowledgeBackend>, config: &KnowledgeIntegrationConfig) -> Self {
        Self {
            backend,
            batch_size: config.batch_size.max(1),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub async fn lookup(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<KnowledgeLookup, KnowledgeUnavailableError> {
        self.lookup_until(keys, None).await
    }

    /// Look up every key, stopping at the per-chunk timeout or `deadline`.
    ///
    /// Fails only when not a single key could be resolved.
    pub async fn lookup_until(
        &self,
        keys: &BTreeSet<String>,
        deadline: Option<Instant>,
    ) -> Result<KnowledgeLookup, KnowledgeUnavailableError> {
        let mut outcome = KnowledgeLookup::default();
        if keys.is_empty() {
            return Ok(outcome);
        }

        let keys: Vec<String> = keys.iter().cloned().collect();
        let chunk_deadline = {
            let own = Instant::now() + self.timeout;
            deadline.map_or(own, |d| d.min(own))
        };

        let chunks = keys.chunks(self.batch_size).map(|chunk| async move {
            let answered =
                tokio::time::timeout_at(chunk_deadline, self.backend.lookup_batch(chunk)).await;
            (chunk, answered)
        });

        let mut last_error = None;
        for (chunk, answered) in join_all(chunks).await {
            let Ok(answers) = answered else {
                warn!(
                    backend = self.backend.name(),
                    keys = chunk.len(),
                    timeout = ?self.timeout,
                    "knowledge lookup timed out"
                );
                outcome.failed += chunk.len();
                last_error = Some(format!("lookup timed out after {:?}", self.timeout));
                continue;
            };

            let mut answers: HashMap<String, _> = answers.into_iter().collect();
            for key in chunk {
                match answers.remove(key) {
                    Some(Ok(entries)) => {
                        outcome.resolved += 1;
                        if !entries.is_empty() {
                            outcome.entries.insert(key.clone(), entries);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(key = %key, error = %e, "knowledge lookup failed");
                        outcome.failed += 1;
                        last_error = Some(e.to_string());
                    }
                    None => {
                        debug!(key = %key, "backend returned no answer for key");
                        outcome.resolved += 1;
                    }
                }
            }
        }

        if outcome.resolved == 0 {
            return Err(KnowledgeUnavailableError {
                attempted: keys.len(),
                last_error,
            });
        }

        debug!(
            resolved = outcome.resolved,
            failed = outcome.failed,
            with_entries = outcome.entries.len(),
            "knowledge lookup finished"
        );
        Ok(outcome)
    }
}
