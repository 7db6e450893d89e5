//! Continuation generation.
//!
//! [`GenerationContext`] turns a narrative model into a bounded prompt;
//! [`GenerationAdapter`] hands it to an injected [`TextGenerator`] and maps
//! its failures onto [`GenerationError`]. Nothing here retries.

mod context;
pub mod openai;

pub use context::*;
pub use openai::OpenAiGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use story_model::{GenerationConfig, NarrativeModel};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::error::GenerationError;

/// Errors raised by a [`TextGenerator`].
#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("generator configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// One request to a generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// An external generative capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError>;

    fn name(&self) -> &str;
}

/// Builds contexts and delegates generation.
#[derive(Clone)]
pub struct GenerationAdapter {
    generator: Option<Arc<dyn TextGenerator>>,
    config: GenerationConfig,
}

impl std::fmt::Debug for GenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationAdapter")
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .field("model", &self.config.model)
            .finish()
    }
}

impl GenerationAdapter {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn build_context(
        &self,
        model: &NarrativeModel,
        text: &str,
        target_length: usize,
    ) -> GenerationContext {
        GenerationContext::build(model, text, target_length, &self.config)
    }

    pub async fn generate(&self, context: &GenerationContext) -> Result<String, GenerationError> {
        self.generate_until(context, None).await
    }

    /// Run one generation call bounded by the configured timeout or `deadline`.
    ///
    /// A non-empty reply is returned verbatim.
    pub async fn generate_until(
        &self,
        context: &GenerationContext,
        deadline: Option<Instant>,
    ) -> Result<String, GenerationError> {
        let generator = self.generator.as_ref().ok_or(GenerationError::NotConfigured)?;
        let request = self.request_for(context);

        let started = Instant::now();
        let own_deadline = started + Duration::from_millis(self.config.timeout_ms);
        let deadline = deadline.map_or(own_deadline, |d| d.min(own_deadline));

        debug!(
            generator = generator.name(),
            model = %request.model,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.chars().count(),
            "requesting continuation"
        );

        let text = tokio::time::timeout_at(deadline, generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout {
                after: started.elapsed(),
            })??;

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn request_for(&self, context: &GenerationContext) -> GenerationRequest {
        let max_tokens = match context.target_length {
            0 => self.config.max_tokens,
            n => n.min(self.config.max_tokens),
        };
        GenerationRequest {
            model: self.config.model.clone(),
            prompt: context.prompt_text.clone(),
            temperature: self.config.temperature,
            max_tokens,
        }
    }
}
