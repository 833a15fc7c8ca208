//! Narrow interfaces onto the two external services the pipeline calls.

use async_trait::async_trait;

use crate::error::{GenerationError, SearchError};

/// Hosted text-generation endpoint.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// Generate a response body for one system/user instruction pair.
    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError>;

    /// Model identifier used for every call made through this capability.
    fn model(&self) -> &str;
}

/// Web search returning a single text blob of findings.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

/// Fixed generation parameters, supplied once when a client is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 1000;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
