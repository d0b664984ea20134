//! Reasoning gateway
//!
//! Opaque text generation used by the profile, research, analysis and
//! synthesis stages. `structured` asks the model to follow a JSON schema and
//! validates that the reply decodes as JSON.

pub mod decode;

use async_trait::async_trait;

use crate::config::Config;
use crate::errors::Result;
use crate::ollama::{Generation, OllamaClient};

pub use decode::{decode_json, find_json_span, strip_code_fence};

/// Freeform and schema-constrained generation
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    /// Generate free text for `prompt`
    async fn freeform(&self, prompt: &str) -> Result<String>;

    /// Generate a JSON value following `schema`
    async fn structured(&self, prompt: &str, schema: &serde_json::Value)
        -> Result<serde_json::Value>;
}

/// Reasoning gateway backed by a local Ollama model
#[derive(Debug, Clone)]
pub struct OllamaGateway {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaGateway {
    pub fn new(client: OllamaClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    /// Build from configuration, sharing `client`
    pub fn from_config(client: OllamaClient, config: &Config) -> Self {
        Self::new(
            client,
            config.ollama.reasoning_model.clone(),
            config.ollama.temperature,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ReasoningGateway for OllamaGateway {
    async fn freeform(&self, prompt: &str) -> Result<String> {
        let text = self
            .client
            .generate(Generation {
                model: &self.model,
                prompt,
                temperature: self.temperature,
                images: Vec::new(),
                format: None,
            })
            .await?;

        tracing::debug!(model = %self.model, chars = text.len(), "freeform generation complete");
        Ok(text)
    }

    async fn structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let text = self
            .client
            .generate(Generation {
                model: &self.model,
                prompt,
                temperature: self.temperature,
                images: Vec::new(),
                format: Some(schema.clone()),
            })
            .await?;

        decode_json(&text)
    }
}
