//! Testing utilities for the narrative engine.
//!
//! Scripted stand-ins for every injected capability, so engine behavior can
//! be exercised deterministically without models, stores or network calls:
//! - [`ScriptedCapability`] for analysis agents
//! - [`ScriptedBackend`] for the knowledge base
//! - [`ScriptedGenerator`] for the generative model

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use story_model::{normalize_key, AgentKind, AgentResult, KnowledgeEntry};

use crate::agents::AnalysisCapability;
use crate::error::AgentExecutionError;
use crate::generation::{GenerationRequest, GeneratorError, TextGenerator};
use crate::knowledge_base::{KnowledgeBackend, KnowledgeBackendError};

/// An analysis capability that returns a fixed result.
#[derive(Debug)]
pub struct ScriptedCapability {
    outcome: Result<AgentResult, (AgentKind, String)>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedCapability {
    pub fn new(result: AgentResult) -> Self {
        Self {
            outcome: Ok(result),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with `AgentExecutionError::Failed`.
    pub fn failing(kind: AgentKind, reason: impl Into<String>) -> Self {
        Self {
            outcome: Err((kind, reason.into())),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering (tokio time, so paused clocks apply).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisCapability for ScriptedCapability {
    async fn analyze(&self, _text: &str) -> Result<AgentResult, AgentExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err((kind, reason)) => Err(AgentExecutionError::failed(*kind, reason.clone())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A knowledge backend with scripted entries and failures.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    entries: Vec<KnowledgeEntry>,
    failing_keys: BTreeSet<String>,
    unreachable: bool,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every lookup fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, entry: KnowledgeEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_failing_key(mut self, key: impl AsRef<str>) -> Self {
        self.failing_keys.insert(normalize_key(key.as_ref()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl KnowledgeBackend for ScriptedBackend {
    async fn lookup(&self, key: &str) -> Result<Vec<KnowledgeEntry>, KnowledgeBackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(KnowledgeBackendError::Unreachable("connection refused".to_string()));
        }

        let key = normalize_key(key);
        if self.failing_keys.contains(&key) {
            return Err(KnowledgeBackendError::Lookup {
                key,
                reason: "scripted failure".to_string(),
            });
        }

        Ok(self
            .entries
            .iter()
            .filter(|e| normalize_key(&e.subject) == key)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A text generator with a scripted reply. Records the last request.
#[derive(Debug)]
pub struct ScriptedGenerator {
    reply: Result<String, String>,
    delay: Option<Duration>,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: None,
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            delay: None,
            last_request: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(GeneratorError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
