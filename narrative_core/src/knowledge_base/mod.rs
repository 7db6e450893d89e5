//! Knowledge Base module - external facts attached to discovered entities.
//!
//! - **KnowledgeBackend**: the store the core queries, injected by the caller
//! - **InMemoryKnowledgeBase**: an indexed, JSON-loadable backend
//! - **KnowledgeIntegrator**: fail-soft, batched lookups for a set of entity keys

mod integrator;
mod store;

pub use integrator::*;
pub use store::*;

use async_trait::async_trait;
use story_model::KnowledgeEntry;
use thiserror::Error;

/// A single key lookup failed.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeBackendError {
    #[error("knowledge backend unreachable: {0}")]
    Unreachable(String),

    #[error("lookup for '{key}' failed: {reason}")]
    Lookup { key: String, reason: String },
}

/// Outcome of one key in a batch lookup.
pub type KeyLookup = (String, Result<Vec<KnowledgeEntry>, KnowledgeBackendError>);

/// An external store of facts keyed by normalized entity name.
///
/// A key with no facts is a miss, returned as `Ok(vec![])`, not an error.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Vec<KnowledgeEntry>, KnowledgeBackendError>;

    /// Look up several keys. The default issues every lookup concurrently;
    /// stores that can batch natively should override it.
    async fn lookup_batch(&self, keys: &[String]) -> Vec<KeyLookup> {
        let lookups = keys
            .iter()
            .map(|key| async move { (key.clone(), self.lookup(key).await) });
        futures::future::join_all(lookups).await
    }

    fn name(&self) -> &str {
        "knowledge-backend"
    }
}
