//! Docent Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout Docent:
//! - Document and chunk models produced by the parser
//! - Vector records persisted in the vector store
//! - Retrieval results, answers and pipeline reports
//! - Common error types
//! - The chat-completion client trait
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DocumentsConfig, LoggingConfig, OpenAiConfig, RagConfig,
    VectorBackend, VectorConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Docent operations
#[derive(Error, Debug)]
pub enum DocentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for DocentError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocentError>;

// ============================================================================
// Document Models
// ============================================================================

/// Text extracted from one source file.
///
/// Created once per file during extraction and consumed by chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name without directory (e.g. `manual.pdf`)
    pub filename: String,

    /// Full extracted text
    pub text: String,

    /// Path the text was extracted from
    pub path: String,
}

impl Document {
    /// Create a new document
    pub fn new(
        filename: impl Into<String>,
        text: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            path: path.into(),
        }
    }
}

/// A bounded segment of a document's text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text (whitespace-trimmed)
    pub text: String,

    /// Source file name
    pub filename: String,

    /// Source path
    pub path: String,

    /// Position of this chunk within its document
    pub chunk_index: u32,

    /// Number of chunks the document was split into
    pub total_chunks: u32,
}

// ============================================================================
// Vector Records
// ============================================================================

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Source file name
    pub filename: String,

    /// Truncated preview of the chunk text
    pub text: String,

    /// Position of the chunk within its document
    pub chunk_index: u32,

    /// Complete chunk text, used to assemble answer context
    pub full_text: String,
}

/// A persisted embedding with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Opaque unique identifier
    pub id: String,

    /// Embedding values
    pub embedding: Vec<f32>,

    /// Record metadata
    pub metadata: RecordMetadata,
}

impl VectorRecord {
    /// Build a record for a chunk with a freshly generated id.
    ///
    /// The metadata preview keeps at most `preview_chars` characters.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>, preview_chars: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            embedding,
            metadata: RecordMetadata {
                filename: chunk.filename.clone(),
                text: chunk.text.chars().take(preview_chars).collect(),
                chunk_index: chunk.chunk_index,
                full_text: chunk.text.clone(),
            },
        }
    }
}

// ============================================================================
// Retrieval and Answer Types
// ============================================================================

/// A record returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Record id
    pub id: String,

    /// Cosine similarity (higher is more similar)
    pub score: f32,

    /// Source file name
    pub filename: String,

    /// Full chunk text
    pub text: String,

    /// Position of the chunk within its document
    pub chunk_index: u32,
}

/// A document cited by an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub filename: String,

    /// Similarity score rounded to three decimals
    pub score: f32,

    pub chunk_index: u32,
}

/// Result of asking a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Whether the pipeline completed without an upstream failure
    pub success: bool,

    /// Human-readable status message
    pub message: String,

    /// Generated (or canned) answer text
    pub answer: String,

    /// Documents the answer was grounded on, most similar first
    pub sources: Vec<Source>,

    /// Number of records returned by the vector store
    pub documents_found: usize,

    /// Number of records that passed the similarity threshold
    pub relevant_documents: usize,
}

impl Answer {
    /// A result carrying no answer text and no sources
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            answer: String::new(),
            sources: Vec::new(),
            documents_found: 0,
            relevant_documents: 0,
        }
    }

    /// A successful result with a canned answer and no sources
    pub fn without_sources(message: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            answer: answer.into(),
            sources: Vec::new(),
            documents_found: 0,
            relevant_documents: 0,
        }
    }
}

/// Counts reported by an indexing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub success: bool,
    pub message: String,
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub embeddings_generated: usize,
}

/// Statistics reported by the vector store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of stored vectors
    pub total_vectors: u64,

    /// Vector dimensionality
    pub dimension: usize,

    /// Fraction of index capacity in use (0.0 - 1.0), when the backend reports it
    pub index_fullness: f32,
}

/// Operational health of the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Whether the vector store answered its stats query
    pub connected: bool,

    pub total_vectors: u64,
    pub dimension: usize,
    pub index_fullness: f32,
    pub pdf_directory: String,
    pub embedding_model: String,
    pub chat_model: String,

    /// Error reported by the vector store when disconnected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Traits
// ============================================================================

/// A chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// System role instruction
    pub system_prompt: String,

    /// User message
    pub user_prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

/// Trait for chat-completion clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model name for status reporting
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
