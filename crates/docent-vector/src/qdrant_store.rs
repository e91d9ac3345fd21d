//! Qdrant implementation for vector storage
//!
//! Stores chunk embeddings in a single cosine-distance collection over gRPC.
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;

use async_trait::async_trait;
use docent_core::{
    DocentError, IndexStats, RecordMetadata, Result, RetrievedChunk, VectorConfig, VectorRecord,
};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

/// Qdrant vector store implementation
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a new Qdrant connection
    pub async fn new(config: &VectorConfig, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| DocentError::VectorStoreError(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.qdrant_collection.clone(),
            dimension,
        })
    }

    fn map_err(context: &str, e: qdrant_client::QdrantError) -> DocentError {
        DocentError::VectorStoreError(format!("{context}: {e}"))
    }
}

/// Build the point payload for a record
fn record_payload(metadata: &RecordMetadata) -> Payload {
    serde_json::to_value(metadata)
        .ok()
        .and_then(|value| Payload::try_from(value).ok())
        .unwrap_or_default()
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn extract_index(value: &QdrantValue) -> Option<u32> {
    match &value.kind {
        Some(Kind::IntegerValue(i)) => u32::try_from(*i).ok(),
        Some(Kind::DoubleValue(d)) if *d >= 0.0 => Some(*d as u32),
        _ => None,
    }
}

/// Map a scored point's payload to a retrieval result.
///
/// Context assembly reads `full_text`; older points without it fall back to
/// the preview.
fn retrieved_chunk(id: String, score: f32, payload: &HashMap<String, QdrantValue>) -> RetrievedChunk {
    let preview = payload.get("text").and_then(extract_string);
    let text = payload
        .get("full_text")
        .and_then(extract_string)
        .or(preview)
        .unwrap_or_default();

    RetrievedChunk {
        id,
        score,
        filename: payload
            .get("filename")
            .and_then(extract_string)
            .unwrap_or_default(),
        text,
        chunk_index: payload
            .get("chunk_index")
            .and_then(extract_index)
            .unwrap_or_default(),
    }
}

#[async_trait]
impl super::VectorStore for QdrantStore {
    async fn ensure_index(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| Self::map_err("Failed to list collections", e))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            debug!(collection = %self.collection, "qdrant collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| Self::map_err("Failed to create collection", e))?;

        info!(
            collection = %self.collection,
            dimension = self.dimension,
            "created qdrant collection"
        );
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                PointStruct::new(
                    record.id.clone(),
                    record.embedding.clone(),
                    record_payload(&record.metadata),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| Self::map_err("Failed to upsert vectors", e))?;

        debug!(collection = %self.collection, count = records.len(), "upserted records");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Self::map_err("Vector search failed", e))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();
                retrieved_chunk(id, point.score, &point.payload)
            })
            .collect();

        Ok(results)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let info = self
            .client
            .collection_info(self.collection.clone())
            .await
            .map_err(|e| Self::map_err("Failed to fetch collection info", e))?;

        let total_vectors = info
            .result
            .and_then(|collection| collection.points_count)
            .unwrap_or_default();

        // Qdrant has no capacity limit to report
        Ok(IndexStats {
            total_vectors,
            dimension: self.dimension,
            index_fullness: 0.0,
        })
    }

    async fn delete_all(&self) -> Result<()> {
        self.client
            .delete_collection(self.collection.clone())
            .await
            .map_err(|e| Self::map_err("Failed to delete collection", e))?;

        info!(collection = %self.collection, "deleted qdrant collection");
        self.ensure_index().await
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
