//! PDF directory processing
//!
//! Scans a directory for PDF files and extracts one [`Document`] per file.
//! Files that fail to extract, or extract to empty text, are skipped.

use std::path::{Path, PathBuf};

use docent_core::Document;
use tracing::{debug, info, warn};

use crate::{DocumentParser, PdfParser};

/// Turns a directory of PDFs into documents
pub struct PdfProcessor<P = PdfParser> {
    directory: PathBuf,
    parser: P,
}

impl PdfProcessor<PdfParser> {
    /// Create a processor for a directory using the PDF parser
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_parser(directory, PdfParser::new())
    }
}

impl<P: DocumentParser> PdfProcessor<P> {
    /// Create a processor with a custom parser
    pub fn with_parser(directory: impl Into<PathBuf>, parser: P) -> Self {
        Self {
            directory: directory.into(),
            parser,
        }
    }

    /// Directory being scanned
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Paths of the parseable files in the directory, sorted by file name.
    ///
    /// A missing or unreadable directory yields an empty list.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    directory = %self.directory.display(),
                    error = %e,
                    "document directory not readable"
                );
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.parser.can_parse(path))
            .collect();
        files.sort();
        files
    }

    /// File names of the parseable files in the directory
    pub fn list_pdfs(&self) -> Vec<String> {
        self.list_files()
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Extract the text of one file, or an empty string on failure
    pub fn extract_text(&self, path: &Path) -> String {
        match self.parser.extract_text(path) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to extract text");
                String::new()
            }
        }
    }

    /// Extract every parseable file in the directory.
    ///
    /// Files with no extractable text are logged and skipped.
    pub fn process_directory(&self) -> Vec<Document> {
        let files = self.list_files();
        if files.is_empty() {
            info!(
                directory = %self.directory.display(),
                "no documents found to process"
            );
            return Vec::new();
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let text = self.extract_text(&path);
            if text.is_empty() {
                warn!(file = %filename, "skipping document with no extractable text");
                continue;
            }

            debug!(file = %filename, chars = text.chars().count(), "processed document");
            documents.push(Document::new(filename, text, path.display().to_string()));
        }

        info!(
            directory = %self.directory.display(),
            documents = documents.len(),
            "document directory processed"
        );
        documents
    }
}
