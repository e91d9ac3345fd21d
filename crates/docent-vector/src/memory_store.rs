//! In-memory vector store using cosine similarity.
//!
//! Suitable for local runs and tests; nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use docent_core::{IndexStats, Result, RetrievedChunk, VectorRecord};
use tokio::sync::RwLock;

/// A vector store backed by a `HashMap` keyed by record id
#[derive(Debug, Default)]
pub struct InMemoryStore {
    dimension: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::default(),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl super::VectorStore for InMemoryStore {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let store = self.records.read().await;

        let mut scored: Vec<RetrievedChunk> = store
            .values()
            .map(|record| RetrievedChunk {
                id: record.id.clone(),
                score: cosine_similarity(&record.embedding, embedding),
                filename: record.metadata.filename.clone(),
                text: record.metadata.full_text.clone(),
                chunk_index: record.metadata.chunk_index,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_vectors: self.records.read().await.len() as u64,
            dimension: self.dimension,
            index_fullness: 0.0,
        })
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
