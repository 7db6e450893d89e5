//! StoryStream demo: analyze a sample story and, when an OpenAI-compatible
//! endpoint is configured, continue it.
//!
//! Logging is controlled with `STORYSTREAM_LOG` (default `info`); the config
//! file with `STORYSTREAM_CONFIG` (default `config.toml`).

use std::path::Path;
use std::sync::Arc;

use narrative_core::generation::OpenAiGenerator;
use narrative_core::{HeuristicResolver, InMemoryKnowledgeBase, NarrativeEngine};
use story_model::StoryStreamConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SAMPLE_STORY: &str = "Once upon a time, there was a young woman named Elara who lived in a small village by the sea. \
She dreamed of exploring the world beyond the horizon. One day, a mysterious ship arrived at the harbor. \
The captain offered her a chance to join the crew. Despite her family's concerns, Elara decided to embark on the journey. \
At sea, she discovered she had a natural talent for navigation using the stars.";

const CONTINUATION_TOKENS: usize = 150;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("STORYSTREAM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_knowledge(config: &StoryStreamConfig) -> InMemoryKnowledgeBase {
    let path = Path::new(&config.knowledge_integration.knowledge_base);
    if !path.exists() {
        info!(path = %path.display(), "no knowledge base file, starting empty");
        return InMemoryKnowledgeBase::new();
    }

    match InMemoryKnowledgeBase::load_json(path) {
        Ok(store) => {
            info!(path = %path.display(), entries = store.len(), "knowledge base loaded");
            store
        }
        Err(e) => {
            warn!(error = %e, "failed to load knowledge base, starting empty");
            InMemoryKnowledgeBase::new()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = StoryStreamConfig::load_default()?;
    info!(name = %config.name, version = %config.version, "starting");

    let mut builder = NarrativeEngine::builder(config.clone()).resolver(HeuristicResolver::new());
    if config.knowledge_integration.enabled {
        builder = builder.knowledge_backend(Arc::new(load_knowledge(&config)));
    }
    let can_generate = match OpenAiGenerator::from_env() {
        Ok(generator) => {
            builder = builder.generator(Arc::new(generator));
            true
        }
        Err(e) => {
            info!(reason = %e, "continuation generation disabled");
            false
        }
    };
    let engine = builder.build()?;

    if !config.demo_mode {
        info!("demo_mode is off, nothing to do");
        return Ok(());
    }

    println!("{SAMPLE_STORY}\n");
    let model = engine.analyze_narrative(SAMPLE_STORY).await?;
    println!("{model}");

    if can_generate {
        let continuation = engine
            .generate_continuation(SAMPLE_STORY, CONTINUATION_TOKENS)
            .await?;
        println!("Continuation:\n{continuation}");
    }

    Ok(())
}
