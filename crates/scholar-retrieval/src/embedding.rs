//! Embedding provider boundary and clients.

use std::env;
use std::future::Future;

use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use scholar_core::{Error, Result};

/// A single embedding vector.
pub type Embedding = Vec<f32>;

/// Default dimension of the deterministic hash embedder.
const HASH_EMBEDDING_DIMENSION: usize = 384;

/// Trait for generating embeddings from text.
///
/// Implementations must be deterministic for a fixed model version: identical
/// text yields an identical vector, so retrieval results are reproducible.
pub trait EmbeddingProvider: Send + Sync {
    /// Ensure the embedding model is available.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if the model cannot be reached or loaded.
    fn ensure_model_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Generate an embedding for a single text.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if embedding generation fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Embed multiple texts in one call, preserving input order and length.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if any embedding generation fails; no
    /// partial output is returned.
    fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Embedding>>> + Send;
}

/// Ollama embedding client.
pub struct OllamaEmbeddingClient {
    /// Handle to the local Ollama daemon.
    ollama: Ollama,
    /// Embedding model name.
    model: String,
}

impl OllamaEmbeddingClient {
    /// Creates a client for the given model, honoring `OLLAMA_HOST`.
    pub fn new<T: Into<String>>(model: T) -> Self {
        let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_owned());
        Self {
            ollama: Ollama::new(host, 11434),
            model: model.into(),
        }
    }
}

impl EmbeddingProvider for OllamaEmbeddingClient {
    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.ollama.list_local_models().await.map_err(|error| {
            Error::EmbeddingUnavailable(format!(
                "failed to connect to Ollama: {error}. Ensure Ollama is installed and running (ollama serve)"
            ))
        })?;

        if !models.iter().any(|model| model.name.contains(&self.model)) {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            )));
        }

        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), text.to_owned().into());

        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| {
                Error::EmbeddingUnavailable(format!("embedding generation failed: {error}"))
            })?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("no embeddings returned".to_owned()))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::default());
        }

        let expected = texts.len();
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), texts.into());

        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| {
                Error::EmbeddingUnavailable(format!("batch embedding generation failed: {error}"))
            })?;

        if response.embeddings.len() != expected {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedding batch returned {} vectors for {} inputs",
                response.embeddings.len(),
                expected
            )));
        }

        Ok(response.embeddings)
    }
}

/// Deterministic hash-based embedding client.
///
/// Maps text to a fixed-dimension vector seeded by its hash. Useful for tests
/// and offline runs: no model is required, identical text always yields the
/// identical vector, and distinct texts almost always land apart.
pub struct HashEmbeddingClient {
    /// Output vector dimension.
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Creates a client producing vectors of the given dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Generates the deterministic embedding for `text`.
    fn hash_embedding(&self, text: &str) -> Embedding {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash as _, Hasher as _};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        let mut vector = Vec::with_capacity(self.dimension);
        for index in 0..self.dimension {
            let value = ((hash.wrapping_add(index as u64)) % 1000) as f32 / 1000.0;
            vector.push(value);
        }
        vector
    }
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        Self::with_dimension(HASH_EMBEDDING_DIMENSION)
    }
}

impl EmbeddingProvider for HashEmbeddingClient {
    async fn ensure_model_available(&self) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.hash_embedding(text))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| self.hash_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeddings_are_deterministic() {
        let client = HashEmbeddingClient::default();

        let first = client.embed("photosynthesis").await;
        let second = client.embed("photosynthesis").await;
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(first.ok(), second.ok());
    }

    #[tokio::test]
    async fn hash_embedding_batch_preserves_order_and_length() {
        let client = HashEmbeddingClient::with_dimension(16);

        let texts = vec!["alpha".to_owned(), "beta".to_owned(), "alpha".to_owned()];
        let batch = client.embed_batch(texts).await;
        assert!(batch.is_ok(), "batch embedding failed");
        if let Ok(vectors) = batch {
            assert_eq!(vectors.len(), 3);
            assert_eq!(vectors[0].len(), 16);
            assert_eq!(vectors[0], vectors[2]);
            assert_ne!(vectors[0], vectors[1]);
        }
    }
}
