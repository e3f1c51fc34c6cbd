//! Embedding providers and order-preserving batch embedding.
//!
//! The [`EmbeddingProvider`] trait abstracts the external embedding model;
//! [`BatchedEmbedder`] splits large inputs into contiguous batches, issues
//! one provider call per batch, and concatenates the results in input
//! order. Callers zip the output positionally against chunks and query
//! variants, so reordering is never permitted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::QaError;

/// Default number of texts per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Converts text into fixed-dimension numeric vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order, all with the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError>;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

/// Order-preserving batching wrapper around an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct BatchedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchedEmbedder {
    /// Wraps `provider` with the [`DEFAULT_BATCH_SIZE`].
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_batch_size(provider, DEFAULT_BATCH_SIZE)
    }

    /// Wraps `provider` with an explicit batch size (minimum 1).
    pub fn with_batch_size(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Identifier of the wrapped model.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embeds all `texts`, one provider call per contiguous batch.
    ///
    /// Guarantees `output.len() == texts.len()` and a uniform vector
    /// dimension across the output. Any batch failure is propagated as
    /// [`QaError::EmbeddingProvider`] without retrying; retry policy
    /// belongs to the transport layer.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        let mut out: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(QaError::EmbeddingProvider(format!(
                    "provider returned {} vectors for a batch of {}",
                    vectors.len(),
                    batch.len()
                )));
            }
            out.extend(vectors);
        }

        if let Some(first) = out.first() {
            let dim = first.len();
            if let Some(bad) = out.iter().find(|v| v.len() != dim) {
                return Err(QaError::DimensionMismatch {
                    expected: dim,
                    got: bad.len(),
                });
            }
        }

        tracing::debug!(
            texts = texts.len(),
            batch_size = self.batch_size,
            model = self.provider.model_name(),
            "embedded texts"
        );
        Ok(out)
    }
}

// ============ HTTP provider (OpenAI-compatible) ============

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding provider speaking the OpenAI-compatible `/embeddings` wire
/// format over HTTP.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpEmbeddingProvider {
    /// Creates a provider for the given endpoint URL, API key, and model.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates a provider from the `QASMITH_EMBEDDING_ENDPOINT`,
    /// `QASMITH_EMBEDDING_API_KEY`, and `QASMITH_EMBEDDING_MODEL`
    /// environment variables (a `.env` file is honored).
    pub fn from_env() -> Result<Self, QaError> {
        dotenvy::dotenv().ok();
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| QaError::EmbeddingProvider(format!("{name} is not set")))
        };
        Ok(Self::new(
            read("QASMITH_EMBEDDING_ENDPOINT")?,
            read("QASMITH_EMBEDDING_API_KEY")?,
            read("QASMITH_EMBEDDING_MODEL")?,
        ))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::EmbeddingProvider(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| QaError::EmbeddingProvider(format!("invalid response payload: {e}")))?;

        Ok(payload.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============ Mock provider ============

/// Deterministic embedding provider for tests and offline development.
///
/// Each text hashes to a fixed-dimension vector: identical texts always get
/// identical vectors and distinct texts almost always differ.
pub struct MockEmbeddingProvider {
    dim: usize,
}

impl MockEmbeddingProvider {
    /// Creates a mock provider with an 8-dimensional output.
    pub fn new() -> Self {
        Self::with_dim(8)
    }

    /// Creates a mock provider with the given output dimension.
    pub fn with_dim(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        Ok(texts
            .iter()
            .map(|text| {
                // FNV-1a seeded per dimension keeps vectors deterministic.
                (0..self.dim)
                    .map(|lane| {
                        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ (lane as u64);
                        for byte in text.as_bytes() {
                            hash ^= u64::from(*byte);
                            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
                        }
                        ((hash % 2000) as f32 / 1000.0) - 1.0
                    })
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
