//! Narrative Engine - the orchestrator behind `analyze_narrative` and
//! `generate_continuation`.
//!
//! One analysis call fans the text out to every active agent on its own
//! task, joins them, re-sorts the surviving results by kind, merges them and
//! optionally enriches the merged model from the knowledge base. Failing
//! agents and knowledge keys cost only their own contribution.

use std::sync::Arc;
use story_model::{AgentResult, NarrativeModel, StoryStreamConfig};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agents::{AgentRegistry, CapabilityResolver, HeuristicResolver};
use crate::error::{ConfigurationError, GenerationError, NarrativeError, Result};
use crate::generation::{GenerationAdapter, TextGenerator};
use crate::knowledge_base::{KnowledgeBackend, KnowledgeIntegrator};
use crate::merger::NarrativeMerger;

/// The narrative engine. Immutable once built; rebuild it to change agents.
#[derive(Debug)]
pub struct NarrativeEngine {
    config: StoryStreamConfig,
    registry: AgentRegistry,
    knowledge: Option<KnowledgeIntegrator>,
    merger: NarrativeMerger,
    generation: GenerationAdapter,
}

/// Builder for [`NarrativeEngine`].
pub struct NarrativeEngineBuilder {
    config: StoryStreamConfig,
    resolver: Box<dyn CapabilityResolver>,
    registry: Option<AgentRegistry>,
    knowledge_backend: Option<Arc<dyn KnowledgeBackend>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl NarrativeEngineBuilder {
    /// Resolver for agent model handles. Defaults to [`HeuristicResolver`].
    pub fn resolver(mut self, resolver: impl CapabilityResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Use ready-made agents instead of resolving them from `agents` config.
    pub fn registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Knowledge store; required when knowledge integration is enabled.
    pub fn knowledge_backend(mut self, backend: Arc<dyn KnowledgeBackend>) -> Self {
        self.knowledge_backend = Some(backend);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Validate the configuration and bring up the agents.
    pub fn build(self) -> std::result::Result<NarrativeEngine, ConfigurationError> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => AgentRegistry::build(&self.config.agents, self.resolver.as_ref())?,
        };

        let knowledge_config = &self.config.knowledge_integration;
        let knowledge = if knowledge_config.enabled {
            let backend = self
                .knowledge_backend
                .ok_or(ConfigurationError::MissingKnowledgeBackend)?;
            Some(KnowledgeIntegrator::new(backend, knowledge_config))
        } else {
            if self.knowledge_backend.is_some() {
                debug!("knowledge integration disabled, ignoring the provided backend");
            }
            None
        };

        let generation = GenerationAdapter::new(self.generator, self.config.generation.clone());

        info!(
            agents = registry.len(),
            unavailable = registry.unavailable().len(),
            knowledge = knowledge.is_some(),
            generator = generation.has_generator(),
            "narrative engine ready"
        );

        Ok(NarrativeEngine {
            config: self.config,
            registry,
            knowledge,
            merger: NarrativeMerger::new(),
            generation,
        })
    }
}

impl NarrativeEngine {
    pub fn builder(config: StoryStreamConfig) -> NarrativeEngineBuilder {
        NarrativeEngineBuilder {
            config,
            resolver: Box::new(HeuristicResolver::new()),
            registry: None,
            knowledge_backend: None,
            generator: None,
        }
    }

    pub fn config(&self) -> &StoryStreamConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn knowledge_enabled(&self) -> bool {
        self.knowledge.is_some()
    }

    pub async fn analyze_narrative(&self, text: &str) -> Result<NarrativeModel> {
        self.analyze_narrative_until(text, None).await
    }

    /// Analyze a text, abandoning agents still running at `deadline`.
    pub async fn analyze_narrative_until(
        &self,
        text: &str,
        deadline: Option<Instant>,
    ) -> Result<NarrativeModel> {
        let run_id = Uuid::new_v4();
        self.analyze(text, deadline)
            .instrument(info_span!("analyze_narrative", %run_id))
            .await
    }

    async fn analyze(&self, text: &str, deadline: Option<Instant>) -> Result<NarrativeModel> {
        if self.registry.is_empty() && self.knowledge.is_none() {
            return Err(NarrativeError::NoAnalysisCapability);
        }

        info!(
            agents = self.registry.len(),
            chars = text.len(),
            "analysis started"
        );

        let results = self.dispatch(text, deadline).await;
        let succeeded = results.len();
        let (mut model, report) = self.merger.merge_with_report(results, None);

        if let Some(integrator) = &self.knowledge {
            match integrator.lookup_until(&model.entity_keys(), deadline).await {
                Ok(found) => self.merger.attach_knowledge(&mut model, &found.entries),
                Err(e) if self.config.knowledge_integration.strict => return Err(e.into()),
                Err(e) => warn!(error = %e, "knowledge unavailable, continuing without enrichment"),
            }
        }

        info!(
            succeeded,
            failed = self.registry.len() - succeeded,
            characters = model.characters.len(),
            events = model.causal_graph.node_count(),
            dropped_edges = report.dropped_edges,
            dropped_spans = report.dropped_spans,
            "analysis finished"
        );
        Ok(model)
    }

    /// Run every agent concurrently and collect the successful results in
    /// kind order.
    async fn dispatch(&self, text: &str, deadline: Option<Instant>) -> Vec<AgentResult> {
        let text: Arc<str> = Arc::from(text);
        let mut tasks = JoinSet::new();

        for agent in self.registry.agents() {
            let agent = agent.clone();
            let text = Arc::clone(&text);
            tasks.spawn(
                async move {
                    let kind = agent.kind();
                    (kind, agent.analyze_until(&text, deadline).await)
                }
                .in_current_span(),
            );
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, Ok(result))) => {
                    debug!(
                        kind = %kind,
                        entities = result.entities.len(),
                        confidence = result.confidence,
                        "agent finished"
                    );
                    results.push(result);
                }
                Ok((kind, Err(e))) => {
                    warn!(kind = %kind, error = %e, "agent failed, excluding its result");
                }
                Err(e) => warn!(error = %e, "agent task aborted"),
            }
        }

        results.sort_by_key(|r| r.agent_kind);
        results
    }

    pub async fn generate_continuation(&self, text: &str, length: usize) -> Result<String> {
        self.generate_continuation_until(text, length, None).await
    }

    /// Analyze `text` and generate a continuation of about `length` tokens.
    pub async fn generate_continuation_until(
        &self,
        text: &str,
        length: usize,
        deadline: Option<Instant>,
    ) -> Result<String> {
        if !self.generation.has_generator() {
            return Err(GenerationError::NotConfigured.into());
        }

        let model = self.analyze_narrative_until(text, deadline).await?;
        let context = self.generation.build_context(&model, text, length);
        let continuation = self.generation.generate_until(&context, deadline).await?;

        debug!(chars = continuation.len(), "continuation generated");
        Ok(continuation)
    }
}
