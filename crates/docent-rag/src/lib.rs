//! Docent RAG - Retrieval-Augmented Generation pipelines
//!
//! This crate implements the two pipelines of the assistant:
//! - Indexing: documents are chunked, embedded and persisted
//! - Retrieval and grounding: a question is embedded, the nearest chunks are
//!   fetched and filtered by similarity, and a chat model answers from them
//!
//! Neither pipeline returns an error to its caller. Upstream failures are
//! logged and reported through the `success` flag of the returned report.
//!
//! Author: hephaex@gmail.com

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use docent_core::{
    Answer, AppConfig, CompletionRequest, Document, IndexReport, LlmClient, Result,
    RetrievedChunk, Source, SystemStatus, VectorRecord,
};
use docent_parser::{chunk_document, ChunkConfig, PdfProcessor};
use docent_vector::{embed_all, EmbeddingClient, VectorStore};
use tracing::{debug, error, info, warn};

pub mod llm;
pub mod prompt;

pub use llm::{create_llm_client, OpenAiClient};
pub use prompt::{assemble_context, grounded_prompt, PromptBuilder, SYSTEM_PROMPT};

// ============================================================================
// Messages
// ============================================================================

pub const EMPTY_QUESTION_MESSAGE: &str = "Question cannot be empty.";
pub const NO_RESULTS_MESSAGE: &str = "No relevant documents found.";
pub const NO_RESULTS_ANSWER: &str =
    "Sorry, I couldn't find relevant information to answer your question.";
pub const NOT_RELEVANT_MESSAGE: &str = "Documents found are not relevant enough.";
pub const NOT_RELEVANT_ANSWER: &str = "I found some documents, but they don't seem very relevant \
                                       to your question. Could you rephrase it?";
pub const ANSWER_MESSAGE: &str = "Answer generated successfully.";
pub const INDEXED_MESSAGE: &str = "Documents indexed successfully.";
pub const NO_DOCUMENTS_MESSAGE: &str = "No documents found to process.";

// ============================================================================
// Settings
// ============================================================================

/// Pipeline settings, taken from [`AppConfig`] once at construction
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub chunking: ChunkConfig,
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub embedding_concurrency: usize,
    pub upsert_batch_size: usize,
    pub preview_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub pdf_directory: String,
    pub embedding_model: String,
}

impl From<&AppConfig> for AssistantSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            chunking: ChunkConfig::from(&config.rag),
            top_k: config.rag.top_k,
            similarity_threshold: config.rag.similarity_threshold,
            embedding_concurrency: config.rag.embedding_concurrency,
            upsert_batch_size: config.vector.upsert_batch_size,
            preview_chars: config.vector.preview_chars,
            max_tokens: config.openai.max_tokens,
            temperature: config.openai.temperature,
            pdf_directory: config.documents.pdf_directory.display().to_string(),
            embedding_model: config.openai.embedding_model.clone(),
        }
    }
}

/// Round a similarity score to three decimals
pub fn round_score(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}

// ============================================================================
// Assistant
// ============================================================================

/// Question-answering assistant over an indexed document corpus
pub struct Assistant {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    settings: AssistantSettings,
}

impl Assistant {
    /// Create a new assistant
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            settings: AssistantSettings::from(config),
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Make sure the vector index exists
    pub async fn prepare(&self) -> Result<()> {
        self.store.ensure_index().await
    }

    /// Extract every PDF in a directory and index it
    pub async fn index_directory(&self, directory: &Path) -> IndexReport {
        let processor = PdfProcessor::new(directory);
        let documents = processor.process_directory();
        self.index_documents(&documents).await
    }

    /// Chunk, embed and persist documents.
    ///
    /// Chunks whose embedding fails are skipped; only an empty document set
    /// or a failed write makes the report unsuccessful.
    pub async fn index_documents(&self, documents: &[Document]) -> IndexReport {
        if documents.is_empty() {
            warn!("no documents to index");
            return IndexReport {
                success: false,
                message: NO_DOCUMENTS_MESSAGE.to_string(),
                documents_processed: 0,
                chunks_created: 0,
                embeddings_generated: 0,
            };
        }

        let start_time = Instant::now();
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|document| chunk_document(document, &self.settings.chunking))
            .collect();
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "documents chunked"
        );

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let batch = embed_all(
            self.embedder.as_ref(),
            &texts,
            self.settings.embedding_concurrency,
        )
        .await;

        for (i, e) in batch.failures() {
            warn!(
                file = %chunks[i].filename,
                chunk_index = chunks[i].chunk_index,
                error = %e,
                "chunk embedding failed, skipping"
            );
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(batch.into_results())
            .filter_map(|(chunk, outcome)| {
                outcome
                    .ok()
                    .filter(|embedding| !embedding.is_empty())
                    .map(|embedding| {
                        VectorRecord::from_chunk(chunk, embedding, self.settings.preview_chars)
                    })
            })
            .collect();

        let mut report = IndexReport {
            success: true,
            message: INDEXED_MESSAGE.to_string(),
            documents_processed: documents.len(),
            chunks_created: chunks.len(),
            embeddings_generated: records.len(),
        };

        if let Err(e) = self.persist(&records).await {
            error!(error = %e, store = self.store.name(), "failed to persist vectors");
            report.success = false;
            report.message = format!("Error indexing documents: {e}");
            return report;
        }

        info!(
            documents = report.documents_processed,
            chunks = report.chunks_created,
            embeddings = report.embeddings_generated,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "indexing complete"
        );
        report
    }

    /// Upsert records in bounded batches, one call at a time
    async fn persist(&self, records: &[VectorRecord]) -> Result<()> {
        let batch_size = self.settings.upsert_batch_size.max(1);
        for (i, batch) in records.chunks(batch_size).enumerate() {
            self.store.upsert(batch).await?;
            info!(batch = i + 1, count = batch.len(), "upserted vector batch");
        }
        Ok(())
    }

    /// Answer a question from the indexed documents.
    ///
    /// `top_k` falls back to the configured default when absent or zero.
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Answer {
        if question.trim().is_empty() {
            return Answer::failure(EMPTY_QUESTION_MESSAGE);
        }

        let top_k = top_k.filter(|k| *k > 0).unwrap_or(self.settings.top_k);
        let start_time = Instant::now();

        match self.answer(question, top_k).await {
            Ok(answer) => {
                info!(
                    sources = answer.sources.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "question answered"
                );
                answer
            }
            Err(e) => {
                error!(error = %e, "failed to answer question");
                Answer::failure(format!("Error processing question: {e}"))
            }
        }
    }

    async fn answer(&self, question: &str, top_k: usize) -> Result<Answer> {
        let embedding = self.embedder.embed(question).await?;
        let found = self.store.query(&embedding, top_k).await?;
        debug!(top_k, found = found.len(), "similar chunks retrieved");

        if found.is_empty() {
            return Ok(Answer::without_sources(NO_RESULTS_MESSAGE, NO_RESULTS_ANSWER));
        }

        let documents_found = found.len();
        let relevant: Vec<RetrievedChunk> = found
            .into_iter()
            .filter(|chunk| chunk.score >= self.settings.similarity_threshold)
            .collect();
        debug!(
            threshold = self.settings.similarity_threshold,
            relevant = relevant.len(),
            "chunks filtered by similarity"
        );

        if relevant.is_empty() {
            let mut answer = Answer::without_sources(NOT_RELEVANT_MESSAGE, NOT_RELEVANT_ANSWER);
            answer.documents_found = documents_found;
            return Ok(answer);
        }

        let context = assemble_context(&relevant);
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: grounded_prompt(question, &context),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        debug!(prompt_chars = request.user_prompt.len(), "calling chat model");
        let text = self.llm.complete(&request).await?;

        let sources = relevant
            .iter()
            .map(|chunk| Source {
                filename: chunk.filename.clone(),
                score: round_score(chunk.score),
                chunk_index: chunk.chunk_index,
            })
            .collect();

        Ok(Answer {
            success: true,
            message: ANSWER_MESSAGE.to_string(),
            answer: text.trim().to_string(),
            sources,
            documents_found,
            relevant_documents: relevant.len(),
        })
    }

    /// Report vector store health and the configured models
    pub async fn system_status(&self) -> SystemStatus {
        let mut status = SystemStatus {
            connected: false,
            total_vectors: 0,
            dimension: 0,
            index_fullness: 0.0,
            pdf_directory: self.settings.pdf_directory.clone(),
            embedding_model: self.settings.embedding_model.clone(),
            chat_model: self.llm.model().to_string(),
            error: None,
        };

        match self.store.stats().await {
            Ok(stats) => {
                status.connected = true;
                status.total_vectors = stats.total_vectors;
                status.dimension = stats.dimension;
                status.index_fullness = stats.index_fullness;
            }
            Err(e) => {
                error!(error = %e, store = self.store.name(), "vector store unreachable");
                status.error = Some(e.to_string());
            }
        }

        status
    }

    /// Delete every indexed vector
    pub async fn reset(&self) -> Result<()> {
        self.store.delete_all().await?;
        info!(store = self.store.name(), "vector store cleared");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
