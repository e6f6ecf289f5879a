//! Provider abstractions for embeddings and chat-style LLMs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod openai;
pub mod retry;

pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("{label} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        label: String,
        attempts: usize,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Transport errors, rate limiting and server-side failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RequestFailed(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `texts` and returns one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    pub preferred_embedding: Option<String>,
    pub preferred_llm: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn with_llm(mut self, name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.llms.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn set_preferred_llm(mut self, name: &str) -> Self {
        self.preferred_llm = Some(name.to_string());
        self
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_embedding.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no embedding provider configured".into())
            })?;
        self.embeddings
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }

    pub fn llm(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_llm.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no llm provider configured".into()))?;
        self.llms
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}
