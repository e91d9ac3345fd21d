//! Docent Parser - PDF text extraction and chunking
//!
//! Provides:
//! - PDF text extraction (`pdf-extract`)
//! - Directory scanning that turns every PDF into a [`Document`]
//! - The chunker that splits document text into bounded, overlapping segments
//!
//! Each parser implements the `DocumentParser` trait so the directory
//! processor can be driven by any extractor.
//!
//! [`Document`]: docent_core::Document

use std::path::Path;
use thiserror::Error;

pub mod chunker;
pub mod pdf;
pub mod processor;

pub use chunker::{chunk_document, chunk_text, split_text, ChunkConfig, TextChunk};
pub use pdf::PdfParser;
pub use processor::PdfProcessor;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during document parsing
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for docent_core::DocentError {
    fn from(err: ParserError) -> Self {
        Self::ParseError(err.to_string())
    }
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for text extractors
pub trait DocumentParser: Send + Sync {
    /// Extract the full text of a file
    fn extract_text(&self, path: &Path) -> Result<String>;

    /// File extension handled by this parser (lowercase, without dot)
    fn extension(&self) -> &str;

    /// Check if this parser can handle a path (extension match, case-insensitive)
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(self.extension()))
            .unwrap_or(false)
    }
}

// ============================================================================
// Tests
// ============================================================================
