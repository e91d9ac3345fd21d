//! Docent Vector - Embedding clients and vector store abstraction
//!
//! Provides the two external collaborators of the pipelines:
//! - [`EmbeddingClient`]: text to fixed-length vectors (OpenAI)
//! - [`VectorStore`]: persistence and cosine nearest-neighbour queries
//!   (Pinecone over REST, Qdrant over gRPC, and an in-memory store)

use std::sync::Arc;

use async_trait::async_trait;
use docent_core::{AppConfig, IndexStats, Result, RetrievedChunk, VectorBackend, VectorRecord};

pub mod embedding;
pub mod memory_store;
pub mod pinecone_store;
pub mod qdrant_store;

pub use embedding::{
    clean_text, create_embedding_client, embed_all, EmbeddingBatch, EmbeddingClient,
    OpenAiEmbedding,
};
pub use memory_store::InMemoryStore;
pub use pinecone_store::PineconeStore;
pub use qdrant_store::QdrantStore;

/// Trait for vector database operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the index/collection when it does not exist yet
    async fn ensure_index(&self) -> Result<()>;

    /// Persist records in a single call (callers bound the batch size)
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Nearest records by cosine similarity, most similar first
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Record count, dimension and fullness
    async fn stats(&self) -> Result<IndexStats>;

    /// Delete every record
    async fn delete_all(&self) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Create the configured vector store.
///
/// Connection setup only; call [`VectorStore::ensure_index`] before indexing.
pub async fn create_vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    let dimension = config.openai.embedding_dimension();
    match config.vector.backend {
        VectorBackend::Pinecone => Ok(Arc::new(PineconeStore::new(&config.vector, dimension)?)),
        VectorBackend::Qdrant => Ok(Arc::new(QdrantStore::new(&config.vector, dimension).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pinecone_store_requires_key() {
        let config = AppConfig::default();
        let err = create_vector_store(&config).await.err();
        assert!(matches!(
            err,
            Some(docent_core::DocentError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_create_pinecone_store() {
        let mut config = AppConfig::default();
        config.vector.pinecone_api_key = Some("pc-test".to_string());

        let store = create_vector_store(&config).await.unwrap();
        assert_eq!(store.name(), "pinecone");
    }
}
