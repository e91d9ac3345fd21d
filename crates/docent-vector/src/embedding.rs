//! Embedding client for generating vector representations
//!
//! Wraps the OpenAI embeddings API. Failures are reported per item so a bad
//! chunk never aborts its siblings during bulk indexing.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use docent_core::{DocentError, OpenAiConfig, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one outcome per input
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingBatch {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        EmbeddingBatch::new(results)
    }

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Model name for status reporting
    fn model(&self) -> &str;
}

// ============================================================================
// Batch Results
// ============================================================================

/// Per-item embedding outcomes, in input order
#[derive(Debug, Default)]
pub struct EmbeddingBatch {
    results: Vec<Result<Vec<f32>>>,
}

impl EmbeddingBatch {
    pub fn new(results: Vec<Result<Vec<f32>>>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of items that produced a vector
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Indices and errors of failed items
    pub fn failures(&self) -> impl Iterator<Item = (usize, &DocentError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    pub fn into_results(self) -> Vec<Result<Vec<f32>>> {
        self.results
    }
}

/// Embed texts with at most `concurrency` requests in flight.
///
/// Outcomes keep the input order; a concurrency of 1 is strictly sequential.
pub async fn embed_all(
    client: &dyn EmbeddingClient,
    texts: &[String],
    concurrency: usize,
) -> EmbeddingBatch {
    let results: Vec<Result<Vec<f32>>> = stream::iter(texts.iter())
        .map(|text| client.embed(text))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    EmbeddingBatch::new(results)
}

fn empty_text_error() -> DocentError {
    DocentError::EmbeddingError("Cannot embed empty text".to_string())
}

/// Normalize text before embedding: newlines become spaces, then trim
pub fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbeddingResponse {
    /// Embeddings sorted by their input index
    fn into_ordered(self) -> Vec<Vec<f32>> {
        let mut data = self.data;
        data.sort_by_key(|d| d.index);
        data.into_iter().map(|d| d.embedding).collect()
    }
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: docent_core::config::embedding_dimension(&model),
            model,
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from config
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DocentError::ConfigError("OpenAI API key required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocentError::ConfigError(format!("HTTP client setup failed: {e}")))?;

        let mut embedding =
            Self::new(api_key.clone(), config.embedding_model.clone()).with_base_url(&config.base_url);
        embedding.client = client;
        Ok(embedding)
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();
        let request = OpenAiEmbeddingRequest {
            input,
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DocentError::EmbeddingError(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocentError::EmbeddingError(format!(
                "OpenAI embedding error ({status}): {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            DocentError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        let embeddings = result.into_ordered();
        if embeddings.len() != expected {
            return Err(DocentError::EmbeddingError(format!(
                "Expected {expected} embeddings, got {}",
                embeddings.len()
            )));
        }

        debug!(model = %self.model, count = expected, "embeddings generated");
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(empty_text_error());
        }

        self.request(vec![cleaned])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocentError::EmbeddingError("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingBatch {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_text(t)).collect();
        let input: Vec<String> = cleaned.iter().filter(|t| !t.is_empty()).cloned().collect();

        if input.is_empty() {
            return EmbeddingBatch::new(cleaned.iter().map(|_| Err(empty_text_error())).collect());
        }

        // One request for every non-empty item; a request failure fails each of them
        let results = match self.request(input).await {
            Ok(embeddings) => {
                let mut embeddings = embeddings.into_iter();
                cleaned
                    .iter()
                    .map(|text| {
                        if text.is_empty() {
                            return Err(empty_text_error());
                        }
                        embeddings.next().ok_or_else(|| {
                            DocentError::EmbeddingError("No embedding returned".to_string())
                        })
                    })
                    .collect()
            }
            Err(e) => {
                let message = e.to_string();
                cleaned
                    .iter()
                    .map(|text| {
                        if text.is_empty() {
                            Err(empty_text_error())
                        } else {
                            Err(DocentError::EmbeddingError(message.clone()))
                        }
                    })
                    .collect()
            }
        };

        EmbeddingBatch::new(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &OpenAiConfig) -> Result<Box<dyn EmbeddingClient>> {
    Ok(Box::new(OpenAiEmbedding::from_config(config)?))
}

// ============================================================================
// Tests
// ============================================================================
