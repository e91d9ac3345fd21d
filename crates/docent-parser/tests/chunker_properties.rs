//! Property tests for the text chunker.

use docent_core::Document;
use docent_parser::{chunk_document, chunk_text, split_text, ChunkConfig};
use proptest::prelude::*;

/// Text made of words, punctuation and line breaks, including multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zçãé]{1,12}[ .!?\n]{0,2}", 0..200)
        .prop_map(|words| words.concat())
}

fn arb_config() -> impl Strategy<Value = ChunkConfig> {
    (1usize..300, 0usize..400).prop_map(|(chunk_size, overlap)| ChunkConfig {
        chunk_size,
        overlap,
    })
}

mod prop_chunk_windows {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_by_size_plus_one(text in arb_text(), config in arb_config()) {
            for chunk in split_text(&text, &config) {
                prop_assert!(chunk.content.chars().count() <= config.chunk_size + 1);
                prop_assert!(chunk.end_offset - chunk.start_offset <= config.chunk_size + 1);
            }
        }

        #[test]
        fn windows_cover_the_text_in_order(text in arb_text(), config in arb_config()) {
            let chunks = split_text(&text, &config);
            let len = text.chars().count();

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start_offset, 0);
            prop_assert_eq!(chunks.last().map(|c| c.end_offset), Some(len));

            for pair in chunks.windows(2) {
                // starts strictly increase and no text is skipped
                prop_assert!(pair[1].start_offset > pair[0].start_offset);
                prop_assert!(pair[1].start_offset <= pair[0].end_offset);
            }
        }

        #[test]
        fn indices_are_sequential(text in arb_text(), config in arb_config()) {
            for (i, chunk) in split_text(&text, &config).iter().enumerate() {
                prop_assert_eq!(chunk.index as usize, i);
            }
        }

        #[test]
        fn short_text_is_a_single_trimmed_chunk(text in "[a-z \n]{0,50}") {
            let chunks = chunk_text(&text, 50, 10);
            prop_assert_eq!(chunks, vec![text.trim().to_string()]);
        }

        #[test]
        fn document_chunks_are_non_empty_and_counted(text in arb_text(), config in arb_config()) {
            let document = Document::new("doc.pdf", text, "pdfs/doc.pdf");
            let chunks = chunk_document(&document, &config);
            let total = chunks.len() as u32;

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(!chunk.text.is_empty());
                prop_assert_eq!(chunk.text.trim(), chunk.text.as_str());
                prop_assert_eq!(chunk.chunk_index, i as u32);
                prop_assert_eq!(chunk.total_chunks, total);
            }
        }
    }
}

#[test]
fn overlap_larger_than_size_still_terminates() {
    let text = "a b c d e f g h i j k l m n o p ".repeat(20);
    let chunks = split_text(
        &text,
        &ChunkConfig {
            chunk_size: 8,
            overlap: 8,
        },
    );
    assert_eq!(
        chunks.last().map(|c| c.end_offset),
        Some(text.chars().count())
    );
}
