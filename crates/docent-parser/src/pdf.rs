//! PDF document parser using pdf-extract
//!
//! Extracts the text of every page and joins pages with newlines.

use std::path::Path;

use crate::{DocumentParser, ParserError, Result};

/// PDF text extractor
#[derive(Debug, Clone, Default)]
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser
    pub fn new() -> Self {
        Self
    }

    /// Extract text from PDF bytes
    pub fn extract_from_bytes(&self, bytes: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        Ok(normalize_pages(&text))
    }
}

/// Replace form feeds (page breaks) with newlines and trim the result
fn normalize_pages(text: &str) -> String {
    text.replace('\x0C', "\n").trim().to_string()
}

impl DocumentParser for PdfParser {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        self.extract_from_bytes(&bytes)
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}
