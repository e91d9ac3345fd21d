//! Text chunking
//!
//! Splits extracted text into bounded, overlapping windows. Near the end of
//! each window the cut is moved back to the nearest natural break (newline,
//! sentence punctuation or space) so words and sentences are not split.
//!
//! Sizes and offsets are measured in characters, not bytes.

use docent_core::{Chunk, Document, RagConfig};

/// How far back from a window's end to look for a natural break
pub const BREAK_LOOKBACK: usize = 100;

const BREAK_CHARS: [char; 5] = ['\n', '.', '!', '?', ' '];

/// Configuration for document chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Overlap between chunks in characters
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl From<&RagConfig> for ChunkConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

/// A chunk of text with its position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Trimmed chunk content
    pub content: String,

    /// Chunk index within the text
    pub index: u32,

    /// Starting character offset of the window
    pub start_offset: usize,

    /// Ending character offset of the window (exclusive)
    pub end_offset: usize,
}

/// Split text into chunk strings.
///
/// Text no longer than `chunk_size` yields exactly one (trimmed) chunk,
/// so empty input yields a single empty chunk.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    split_text(
        text,
        &ChunkConfig {
            chunk_size,
            overlap,
        },
    )
    .into_iter()
    .map(|chunk| chunk.content)
    .collect()
}

/// Split text into positioned chunks.
///
/// Every iteration advances the window start by at least one character,
/// so any `(chunk_size, overlap)` pair terminates.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = config.chunk_size.max(1);

    if len <= size {
        return vec![TextChunk {
            content: text.trim().to_string(),
            index: 0,
            start_offset: 0,
            end_offset: len,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start + size;

        if end < len {
            if let Some(pos) = find_break_point(&chars, start, end, size) {
                end = pos + 1;
            }
        }

        let end = end.min(len);
        let content: String = chars[start..end].iter().collect();

        chunks.push(TextChunk {
            content: content.trim().to_string(),
            index: chunks.len() as u32,
            start_offset: start,
            end_offset: end,
        });

        if end >= len {
            break;
        }

        let next = end.saturating_sub(config.overlap);
        start = if next > start { next } else { start + 1 };
    }

    chunks
}

/// Search backwards from `end` (inclusive) for a break character.
///
/// The search stops before `start + size - BREAK_LOOKBACK`, and never
/// reaches the window start itself.
fn find_break_point(chars: &[char], start: usize, end: usize, size: usize) -> Option<usize> {
    let lower = start + size.saturating_sub(BREAK_LOOKBACK);
    (lower + 1..=end)
        .rev()
        .find(|&i| BREAK_CHARS.contains(&chars[i]))
}

/// Chunk a document, dropping chunks that are empty after trimming.
///
/// Chunk indices are contiguous and `total_chunks` counts the kept chunks.
pub fn chunk_document(document: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let pieces: Vec<String> = split_text(&document.text, config)
        .into_iter()
        .map(|chunk| chunk.content)
        .filter(|content| !content.is_empty())
        .collect();

    let total_chunks = pieces.len() as u32;
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            text,
            filename: document.filename.clone(),
            path: document.path.clone(),
            chunk_index: i as u32,
            total_chunks,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
