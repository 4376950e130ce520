//! Embedding service client
//!
//! Provides the `Embedder` abstraction over the remote embedding service,
//! an OpenAI-backed implementation, and a mock for tests.
//!
//! There is deliberately no retry here: a failed embedding request leaves
//! the affected statuses without vectors for the rest of the request, and
//! the dependent features degrade to zero.

use crate::errors::{AppError, Result};
use crate::{EMBEDDING_DIM, EMBEDDING_MODEL};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in one request. The returned
    /// vectors align positionally with the input texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAiRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: EMBEDDING_MODEL.to_string(),
            base_url,
        })
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAiRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OpenAiResponse =
            response.json().await.map_err(|e| AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingError {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.make_request(texts).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Test embedder. Vectors are derived from the text alone, so the same
/// status content always embeds to the same vector, matching the
/// determinism the cache's write-back relies on.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Mock at the service's native dimension
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }

    /// Mock at a custom dimension, for exercising the length validation
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let seed = text
            .bytes()
            .fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u32));
        Ok((0..self.dimension)
            .map(|component| {
                let hashed = seed
                    .wrapping_add(component as u32)
                    .wrapping_mul(2_654_435_761);
                hashed as f32 / u32::MAX as f32 * 2.0 - 1.0
            })
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "mock-status-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create the embedder configured for this deployment
pub fn create_embedder(config: &crate::AppConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = OpenAiEmbedder::new(
        config.openai_key.clone(),
        config.openai_api_base.clone(),
        config.embedding_timeout(),
    )?;
    Ok(Arc::new(embedder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_native_dimension() {
        let embedder = MockEmbedder::new();
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic_per_text() {
        let embedder = MockEmbedder::new();
        let first = embedder.embed("hello fediverse").await.unwrap();
        let again = embedder.embed("hello fediverse").await.unwrap();
        let other = embedder.embed("something else").await.unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_mock_batch_aligns_with_input() {
        let embedder = MockEmbedder::with_dimension(8);
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 8);
        assert_eq!(embeddings[0], embedder.embed("text1").await.unwrap());
        assert_eq!(embeddings[1], embedder.embed("text2").await.unwrap());
    }
}
