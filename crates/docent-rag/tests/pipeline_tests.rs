//! Pipeline tests with in-process fake embedding, vector and chat clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docent_core::{
    AppConfig, CompletionRequest, DocentError, Document, IndexStats, LlmClient, Result,
    RetrievedChunk, VectorRecord,
};
use docent_rag::{
    Assistant, ANSWER_MESSAGE, EMPTY_QUESTION_MESSAGE, INDEXED_MESSAGE, NOT_RELEVANT_ANSWER,
    NOT_RELEVANT_MESSAGE, NO_DOCUMENTS_MESSAGE, NO_RESULTS_ANSWER, NO_RESULTS_MESSAGE,
    SYSTEM_PROMPT,
};
use docent_vector::{EmbeddingClient, InMemoryStore, VectorStore};

// ============================================================================
// Fakes
// ============================================================================

/// Letter-frequency embedder; texts starting with `x` or containing `FAIL` fail
#[derive(Default)]
struct FakeEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.starts_with('x') || text.contains("FAIL") {
            return Err(DocentError::EmbeddingError("rate limited".to_string()));
        }

        let mut vector = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        26
    }

    fn model(&self) -> &str {
        "fake-embedding"
    }
}

/// Store that records writes and serves canned query results
#[derive(Default)]
struct FakeStore {
    results: Vec<RetrievedChunk>,
    fail_query: bool,
    fail_upsert: bool,
    fail_stats: bool,
    upsert_batches: Mutex<Vec<usize>>,
    upserted: Mutex<Vec<VectorRecord>>,
    queries: Mutex<Vec<usize>>,
    deletes: AtomicUsize,
}

impl FakeStore {
    fn with_results(results: Vec<RetrievedChunk>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len() + self.upsert_batches.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if self.fail_upsert {
            return Err(DocentError::VectorStoreError("write rejected".to_string()));
        }
        self.upsert_batches.lock().unwrap().push(records.len());
        self.upserted.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn query(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.queries.lock().unwrap().push(top_k);
        if self.fail_query {
            return Err(DocentError::VectorStoreError("index unavailable".to_string()));
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        if self.fail_stats {
            return Err(DocentError::VectorStoreError("connection refused".to_string()));
        }
        Ok(IndexStats {
            total_vectors: self.upserted.lock().unwrap().len() as u64,
            dimension: 26,
            index_fullness: 0.25,
        })
    }

    async fn delete_all(&self) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Chat client returning a fixed reply and recording requests
struct FakeLlm {
    reply: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeLlm {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .clone()
            .ok_or_else(|| DocentError::LlmError("model overloaded".to_string()))
    }

    fn model(&self) -> &str {
        "fake-chat"
    }
}

fn retrieved(filename: &str, score: f32, chunk_index: u32) -> RetrievedChunk {
    RetrievedChunk {
        id: format!("{filename}-{chunk_index}"),
        score,
        filename: filename.to_string(),
        text: format!("Text of {filename} chunk {chunk_index}."),
        chunk_index,
    }
}

struct Harness {
    embedder: Arc<FakeEmbedder>,
    store: Arc<FakeStore>,
    llm: Arc<FakeLlm>,
    assistant: Assistant,
}

fn harness(store: FakeStore, llm: FakeLlm, config: &AppConfig) -> Harness {
    let embedder = Arc::new(FakeEmbedder::default());
    let store = Arc::new(store);
    let llm = Arc::new(llm);
    let assistant = Assistant::new(embedder.clone(), store.clone(), llm.clone(), config);
    Harness {
        embedder,
        store,
        llm,
        assistant,
    }
}

// ============================================================================
// Retrieval and grounding
// ============================================================================

#[tokio::test]
async fn empty_question_makes_no_upstream_calls() {
    let h = harness(
        FakeStore::with_results(vec![retrieved("a.pdf", 0.9, 0)]),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    for question in ["", "   ", "\n\t"] {
        let answer = h.assistant.ask(question, None).await;
        assert!(!answer.success);
        assert_eq!(answer.message, EMPTY_QUESTION_MESSAGE);
        assert!(answer.answer.is_empty());
        assert!(answer.sources.is_empty());
    }

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.calls(), 0);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn no_results_is_a_normal_outcome() {
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let answer = h.assistant.ask("What is covered?", None).await;
    assert!(answer.success);
    assert_eq!(answer.message, NO_RESULTS_MESSAGE);
    assert_eq!(answer.answer, NO_RESULTS_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn results_below_threshold_skip_generation() {
    let h = harness(
        FakeStore::with_results(vec![retrieved("a.pdf", 0.65, 0)]),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let answer = h.assistant.ask("What is covered?", None).await;
    assert!(answer.success);
    assert_eq!(answer.message, NOT_RELEVANT_MESSAGE);
    assert_eq!(answer.answer, NOT_RELEVANT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.documents_found, 1);
    assert_eq!(answer.relevant_documents, 0);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn sources_follow_filtered_order_with_rounded_scores() {
    let h = harness(
        FakeStore::with_results(vec![
            retrieved("a.pdf", 0.951_23, 2),
            retrieved("b.pdf", 0.812_34, 0),
            retrieved("c.pdf", 0.7, 5),
            retrieved("d.pdf", 0.6, 1),
        ]),
        FakeLlm::replying("  The warranty lasts two years [Document 1].\n"),
        &AppConfig::default(),
    );

    let answer = h.assistant.ask("How long is the warranty?", None).await;
    assert!(answer.success);
    assert_eq!(answer.message, ANSWER_MESSAGE);
    assert_eq!(answer.answer, "The warranty lasts two years [Document 1].");
    assert_eq!(answer.documents_found, 4);
    assert_eq!(answer.relevant_documents, 3);

    let sources: Vec<(&str, f32, u32)> = answer
        .sources
        .iter()
        .map(|s| (s.filename.as_str(), s.score, s.chunk_index))
        .collect();
    assert_eq!(
        sources,
        vec![("a.pdf", 0.951, 2), ("b.pdf", 0.812, 0), ("c.pdf", 0.7, 5)]
    );
    for pair in answer.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let requests = h.llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.system_prompt, SYSTEM_PROMPT);
    assert_eq!(request.max_tokens, 1000);
    assert!((request.temperature - 0.3).abs() < 1e-6);
    assert!(request.user_prompt.contains("Document 1 (a.pdf):\nText of a.pdf chunk 2."));
    assert!(request.user_prompt.contains("Document 3 (c.pdf):"));
    assert!(!request.user_prompt.contains("d.pdf"));
    assert!(request.user_prompt.contains("Question: How long is the warranty?"));
}

#[tokio::test]
async fn top_k_defaults_and_overrides() {
    let mut config = AppConfig::default();
    config.rag.top_k = 4;
    let h = harness(FakeStore::default(), FakeLlm::replying("ok"), &config);

    h.assistant.ask("first", None).await;
    h.assistant.ask("second", Some(0)).await;
    h.assistant.ask("third", Some(2)).await;

    assert_eq!(*h.store.queries.lock().unwrap(), vec![4, 4, 2]);
}

#[tokio::test]
async fn embedding_failure_becomes_failed_answer() {
    let h = harness(
        FakeStore::with_results(vec![retrieved("a.pdf", 0.9, 0)]),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let answer = h.assistant.ask("please FAIL here", None).await;
    assert!(!answer.success);
    assert!(answer.message.starts_with("Error processing question:"));
    assert!(answer.message.contains("rate limited"));
    assert!(answer.answer.is_empty());
    assert!(answer.sources.is_empty());
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn query_failure_becomes_failed_answer() {
    let store = FakeStore {
        fail_query: true,
        ..Default::default()
    };
    let h = harness(store, FakeLlm::replying("unused"), &AppConfig::default());

    let answer = h.assistant.ask("What is covered?", None).await;
    assert!(!answer.success);
    assert!(answer.message.contains("index unavailable"));
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn generation_failure_becomes_failed_answer() {
    let h = harness(
        FakeStore::with_results(vec![retrieved("a.pdf", 0.9, 0)]),
        FakeLlm::failing(),
        &AppConfig::default(),
    );

    let answer = h.assistant.ask("What is covered?", None).await;
    assert!(!answer.success);
    assert!(answer.message.contains("model overloaded"));
    assert!(answer.answer.is_empty());
    assert!(answer.sources.is_empty());
}

// ============================================================================
// Indexing
// ============================================================================

fn small_chunk_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rag.chunk_size = 20;
    config.rag.chunk_overlap = 0;
    config
}

/// Two documents, five chunks; the third chunk's embedding fails
fn five_chunk_documents() -> Vec<Document> {
    vec![
        Document::new(
            "first.pdf",
            format!("{}{}{}", "a".repeat(20), "b".repeat(20), "x".repeat(20)),
            "pdfs/first.pdf",
        ),
        Document::new(
            "second.pdf",
            format!("{}{}", "d".repeat(20), "e".repeat(20)),
            "pdfs/second.pdf",
        ),
    ]
}

#[tokio::test]
async fn failed_chunk_embedding_is_skipped() {
    for concurrency in [1, 3] {
        let mut config = small_chunk_config();
        config.rag.embedding_concurrency = concurrency;
        let h = harness(FakeStore::default(), FakeLlm::replying("unused"), &config);

        let report = h.assistant.index_documents(&five_chunk_documents()).await;

        assert!(report.success);
        assert_eq!(report.message, INDEXED_MESSAGE);
        assert_eq!(report.documents_processed, 2);
        assert_eq!(report.chunks_created, 5);
        assert_eq!(report.embeddings_generated, 4);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 5);

        let upserted = h.store.upserted.lock().unwrap();
        assert_eq!(upserted.len(), 4);
        assert!(upserted.iter().all(|r| !r.metadata.full_text.starts_with('x')));

        let indices: Vec<(&str, u32)> = upserted
            .iter()
            .map(|r| (r.metadata.filename.as_str(), r.metadata.chunk_index))
            .collect();
        assert_eq!(
            indices,
            vec![
                ("first.pdf", 0),
                ("first.pdf", 1),
                ("second.pdf", 0),
                ("second.pdf", 1)
            ]
        );
    }
}

#[tokio::test]
async fn records_get_unique_ids_and_previews() {
    let mut config = small_chunk_config();
    config.vector.preview_chars = 5;
    let h = harness(FakeStore::default(), FakeLlm::replying("unused"), &config);

    h.assistant.index_documents(&five_chunk_documents()).await;

    let upserted = h.store.upserted.lock().unwrap();
    let mut ids: Vec<&str> = upserted.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(upserted[0].metadata.text, "aaaaa");
    assert_eq!(upserted[0].metadata.full_text, "a".repeat(20));
}

#[tokio::test]
async fn upserts_are_batched() {
    let documents: Vec<Document> = (0..250)
        .map(|i| Document::new(format!("doc-{i}.pdf"), "short text", format!("pdfs/doc-{i}.pdf")))
        .collect();
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let report = h.assistant.index_documents(&documents).await;
    assert!(report.success);
    assert_eq!(report.embeddings_generated, 250);
    assert_eq!(*h.store.upsert_batches.lock().unwrap(), vec![100, 100, 50]);
}

#[tokio::test]
async fn empty_document_set_fails() {
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let report = h.assistant.index_documents(&[]).await;
    assert!(!report.success);
    assert_eq!(report.message, NO_DOCUMENTS_MESSAGE);
    assert_eq!(report.chunks_created, 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upsert_failure_fails_the_report() {
    let store = FakeStore {
        fail_upsert: true,
        ..Default::default()
    };
    let h = harness(store, FakeLlm::replying("unused"), &small_chunk_config());

    let report = h.assistant.index_documents(&five_chunk_documents()).await;
    assert!(!report.success);
    assert!(report.message.contains("write rejected"));
    assert_eq!(report.chunks_created, 5);
}

#[tokio::test]
async fn directory_without_pdfs_indexes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a pdf").unwrap();
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let report = h.assistant.index_directory(dir.path()).await;
    assert!(!report.success);
    assert_eq!(report.message, NO_DOCUMENTS_MESSAGE);
}

// ============================================================================
// Round trip through the in-memory store
// ============================================================================

#[tokio::test]
async fn indexed_chunk_is_its_own_nearest_neighbour() {
    let embedder = Arc::new(FakeEmbedder::default());
    let store = Arc::new(InMemoryStore::new(26));
    let llm = Arc::new(FakeLlm::replying("Two years."));
    let assistant = Assistant::new(
        embedder.clone(),
        store.clone(),
        llm.clone(),
        &AppConfig::default(),
    );

    let text = "The warranty covers parts and labour for two years.";
    let report = assistant
        .index_documents(&[Document::new("warranty.pdf", text, "pdfs/warranty.pdf")])
        .await;
    assert_eq!(report.embeddings_generated, 1);

    let embedding = embedder.embed(text).await.unwrap();
    let results = store.query(&embedding, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "warranty.pdf");
    assert_eq!(results[0].text, text);
    assert!((results[0].score - 1.0).abs() < 1e-5);

    let answer = assistant.ask(text, None).await;
    assert!(answer.success);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].score, 1.0);
}

// ============================================================================
// Status and reset
// ============================================================================

#[tokio::test]
async fn status_reports_store_stats() {
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    let status = h.assistant.system_status().await;
    assert!(status.connected);
    assert_eq!(status.dimension, 26);
    assert!((status.index_fullness - 0.25).abs() < 1e-6);
    assert_eq!(status.pdf_directory, "pdfs");
    assert_eq!(status.embedding_model, "text-embedding-3-small");
    assert_eq!(status.chat_model, "fake-chat");
    assert!(status.error.is_none());
}

#[test]
fn status_reports_disconnected_store() {
    let store = FakeStore {
        fail_stats: true,
        ..Default::default()
    };
    let h = harness(store, FakeLlm::replying("unused"), &AppConfig::default());

    let status = tokio_test::block_on(h.assistant.system_status());
    assert!(!status.connected);
    assert_eq!(status.total_vectors, 0);
    assert_eq!(status.error.as_deref(), Some("Vector store error: connection refused"));
    assert_eq!(status.chat_model, "fake-chat");
}

#[tokio::test]
async fn reset_clears_the_store() {
    let h = harness(
        FakeStore::default(),
        FakeLlm::replying("unused"),
        &AppConfig::default(),
    );

    h.assistant.prepare().await.unwrap();
    h.assistant.reset().await.unwrap();
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), 1);
}
