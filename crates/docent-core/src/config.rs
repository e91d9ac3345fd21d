//! Docent Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! defaults matching the hosted OpenAI + Pinecone setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// OpenAI embedding and chat configuration
    pub openai: OpenAiConfig,

    /// Vector store connection
    pub vector: VectorConfig,

    /// Chunking and retrieval parameters
    pub rag: RagConfig,

    /// Source documents
    pub documents: DocumentsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup over defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // OpenAI
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(model) = lookup("OPENAI_EMBEDDING_MODEL").or_else(|| lookup("EMBEDDING_MODEL"))
        {
            self.openai.embedding_model = model;
        }
        if let Some(model) = lookup("OPENAI_CHAT_MODEL").or_else(|| lookup("LLM_MODEL")) {
            self.openai.chat_model = model;
        }
        if let Some(value) = lookup("OPENAI_MAX_TOKENS") {
            self.openai.max_tokens = parse_value("OPENAI_MAX_TOKENS", value)?;
        }
        if let Some(value) = lookup("OPENAI_TEMPERATURE") {
            self.openai.temperature = parse_value("OPENAI_TEMPERATURE", value)?;
        }

        // Vector store
        if let Some(backend) = lookup("VECTOR_BACKEND") {
            self.vector.backend = backend.parse()?;
        }
        if let Some(key) = lookup("PINE_CONE_API_KEY") {
            self.vector.pinecone_api_key = Some(key);
        }
        if let Some(env) = lookup("PINE_CONE_ENVIRONMENT") {
            self.vector.pinecone_environment = env;
        }
        if let Some(name) = lookup("PINE_CONE_INDEX_NAME") {
            self.vector.pinecone_index_name = name;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.vector.qdrant_url = url;
        }
        if let Some(collection) = lookup("QDRANT_COLLECTION") {
            self.vector.qdrant_collection = collection;
        }

        // Documents
        if let Some(dir) = lookup("PDF_DIRECTORY") {
            self.documents.pdf_directory = PathBuf::from(dir);
        }

        // RAG
        if let Some(value) = lookup("CHUNK_SIZE") {
            self.rag.chunk_size = parse_value("CHUNK_SIZE", value)?;
        }
        if let Some(value) = lookup("CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_value("CHUNK_OVERLAP", value)?;
        }
        if let Some(value) = lookup("DEFAULT_TOP_K") {
            self.rag.top_k = parse_value("DEFAULT_TOP_K", value)?;
        }
        if let Some(value) = lookup("SIMILARITY_THRESHOLD") {
            self.rag.similarity_threshold = parse_value("SIMILARITY_THRESHOLD", value)?;
        }
        if let Some(value) = lookup("EMBEDDING_CONCURRENCY") {
            self.rag.embedding_concurrency = parse_value("EMBEDDING_CONCURRENCY", value)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }

    /// Check that required credentials are present and parameters are usable.
    ///
    /// Must pass before any component is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if is_blank(&self.openai.api_key) {
            missing.push("OPENAI_API_KEY");
        }
        if self.vector.backend == VectorBackend::Pinecone && is_blank(&self.vector.pinecone_api_key)
        {
            missing.push("PINE_CONE_API_KEY");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing.join(", ")));
        }

        if self.rag.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHUNK_SIZE".to_string(),
                value: "0".to_string(),
            });
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_TOP_K".to_string(),
                value: "0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "SIMILARITY_THRESHOLD".to_string(),
                value: self.rag.similarity_threshold.to_string(),
            });
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// OpenAI API key
    pub api_key: Option<String>,

    /// API base URL (for compatible APIs)
    pub base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Chat-completion model name
    pub chat_model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Vector dimension produced by the configured embedding model
    pub fn embedding_dimension(&self) -> usize {
        embedding_dimension(&self.embedding_model)
    }
}

/// Vector dimension for a known OpenAI embedding model
pub fn embedding_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o".to_string(),
            max_tokens: 1000,
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Which vector store to use
    pub backend: VectorBackend,

    /// Pinecone API key
    pub pinecone_api_key: Option<String>,

    /// Pinecone environment label
    pub pinecone_environment: String,

    /// Pinecone index name
    pub pinecone_index_name: String,

    /// Cloud for serverless index creation
    pub pinecone_cloud: String,

    /// Region for serverless index creation
    pub pinecone_region: String,

    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant collection name
    pub qdrant_collection: String,

    /// Maximum records per upsert call
    pub upsert_batch_size: usize,

    /// Characters of chunk text kept in the metadata preview
    pub preview_chars: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            pinecone_api_key: None,
            pinecone_environment: "us-east-1-aws".to_string(),
            pinecone_index_name: "pdf-assistant".to_string(),
            pinecone_cloud: "aws".to_string(),
            pinecone_region: "us-east-1".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_collection: "pdf-assistant".to_string(),
            upsert_batch_size: 100,
            preview_chars: 1000,
        }
    }
}

/// Supported vector store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Pinecone,
    Qdrant,
}

impl FromStr for VectorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pinecone => write!(f, "pinecone"),
            Self::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Number of nearest records to retrieve per question
    pub top_k: usize,

    /// Minimum similarity for a record to ground an answer
    pub similarity_threshold: f32,

    /// Concurrent embedding requests while indexing (1 = sequential)
    pub embedding_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: 0.7,
            embedding_concurrency: 1,
        }
    }
}

/// Source document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory scanned for PDF files
    pub pdf_directory: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            pdf_directory: PathBuf::from("pdfs"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
