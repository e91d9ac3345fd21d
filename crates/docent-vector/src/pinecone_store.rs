//! Pinecone implementation for vector storage
//!
//! Talks to the Pinecone REST API: the control plane resolves (or creates)
//! a serverless index, the data plane at the index host serves upserts,
//! queries and stats.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use docent_core::{
    DocentError, IndexStats, RecordMetadata, Result, RetrievedChunk, VectorConfig, VectorRecord,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Polls of the control plane while a new index becomes ready
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pinecone vector store implementation
pub struct PineconeStore {
    client: Client,
    api_key: String,
    control_url: String,
    index_name: String,
    cloud: String,
    region: String,
    dimension: usize,
    host: OnceCell<String>,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
}

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a RecordMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: MatchMetadata,
}

/// Metadata as returned by Pinecone, which reports every number as a float
#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    chunk_index: f64,
    full_text: Option<String>,
}

impl From<QueryMatch> for RetrievedChunk {
    fn from(m: QueryMatch) -> Self {
        let metadata = m.metadata;
        Self {
            id: m.id,
            score: m.score,
            filename: metadata.filename,
            text: metadata.full_text.unwrap_or(metadata.text),
            chunk_index: metadata.chunk_index.max(0.0) as u32,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    index_fullness: f32,
    #[serde(default)]
    total_vector_count: u64,
}

impl From<StatsResponse> for IndexStats {
    fn from(stats: StatsResponse) -> Self {
        Self {
            total_vectors: stats.total_vector_count,
            dimension: stats.dimension,
            index_fullness: stats.index_fullness,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    delete_all: bool,
}

// ============================================================================
// Store
// ============================================================================

impl PineconeStore {
    /// Create a store for the configured index.
    ///
    /// No request is made until the first operation.
    pub fn new(config: &VectorConfig, dimension: usize) -> Result<Self> {
        let api_key = config
            .pinecone_api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DocentError::ConfigError(
                    "Pinecone API key not found. Set PINE_CONE_API_KEY.".to_string(),
                )
            })?;

        Ok(Self {
            client: Client::new(),
            api_key: api_key.clone(),
            control_url: CONTROL_PLANE_URL.to_string(),
            index_name: config.pinecone_index_name.clone(),
            cloud: config.pinecone_cloud.clone(),
            region: config.pinecone_region.clone(),
            dimension,
            host: OnceCell::new(),
        })
    }

    /// Use a known data-plane host instead of resolving it
    pub fn with_host(self, host: impl Into<String>) -> Self {
        let host = OnceCell::new_with(Some(normalize_host(&host.into())));
        Self { host, ..self }
    }

    /// Use a different control-plane root (local emulators)
    pub fn with_control_url(mut self, url: impl Into<String>) -> Self {
        self.control_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Describe the index, `None` when it does not exist
    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_url, self.index_name);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| store_error("Pinecone describe index request failed", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response, "describe index").await.map(Some)
    }

    async fn create_index(&self) -> Result<()> {
        let request = CreateIndexRequest {
            name: &self.index_name,
            dimension: self.dimension,
            metric: "cosine",
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let url = format!("{}/indexes", self.control_url);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&request)
            .send()
            .await
            .map_err(|e| store_error("Pinecone create index request failed", e))?;

        // Someone else created it first
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response, "create index").await?;

        info!(
            index = %self.index_name,
            dimension = self.dimension,
            cloud = %self.cloud,
            region = %self.region,
            "created pinecone index"
        );
        Ok(())
    }

    /// Data-plane host of the index, resolved once
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                self.describe_index().await?.map(|d| normalize_host(&d.host)).ok_or_else(|| {
                    DocentError::VectorStoreError(format!(
                        "Pinecone index '{}' does not exist",
                        self.index_name
                    ))
                })
            })
            .await?;
        Ok(host.as_str())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host().await?, path);
        self.request(reqwest::Method::POST, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| store_error("Pinecone request failed", e))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn store_error(context: &str, e: reqwest::Error) -> DocentError {
    DocentError::VectorStoreError(format!("{context}: {e}"))
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(DocentError::VectorStoreError(format!(
        "Pinecone {operation} error ({status}): {error_text}"
    )))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, operation: &str) -> Result<T> {
    check_status(response, operation)
        .await?
        .json()
        .await
        .map_err(|e| {
            DocentError::VectorStoreError(format!(
                "Failed to parse Pinecone {operation} response: {e}"
            ))
        })
}

#[async_trait]
impl super::VectorStore for PineconeStore {
    async fn ensure_index(&self) -> Result<()> {
        if self.describe_index().await?.is_some() {
            debug!(index = %self.index_name, "pinecone index already exists");
            return Ok(());
        }

        info!(index = %self.index_name, "creating pinecone index");
        self.create_index().await?;

        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe_index().await? {
                if description.status.ready {
                    let _ = self.host.set(normalize_host(&description.host));
                    return Ok(());
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        Err(DocentError::VectorStoreError(format!(
            "Pinecone index '{}' did not become ready",
            self.index_name
        )))
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|record| PineconeVector {
                    id: &record.id,
                    values: &record.embedding,
                    metadata: &record.metadata,
                })
                .collect(),
        };

        let response = self.post("/vectors/upsert", &request).await?;
        check_status(response, "upsert").await?;

        debug!(index = %self.index_name, count = records.len(), "upserted records");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let request = QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response = self.post("/query", &request).await?;
        let result: QueryResponse = read_json(response, "query").await?;

        Ok(result.matches.into_iter().map(RetrievedChunk::from).collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?;
        let stats: StatsResponse = read_json(response, "describe index stats").await?;
        Ok(stats.into())
    }

    async fn delete_all(&self) -> Result<()> {
        let response = self
            .post("/vectors/delete", &DeleteRequest { delete_all: true })
            .await?;
        check_status(response, "delete").await?;

        info!(index = %self.index_name, "deleted all pinecone vectors");
        Ok(())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

// ============================================================================
// Tests
// ============================================================================
