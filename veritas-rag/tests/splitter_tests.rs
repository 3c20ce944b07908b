//! Properties and scenarios for the recursive separator splitter.

use proptest::prelude::*;
use veritas_rag::{
    Chunker, DEFAULT_SEPARATORS, Document, FixedSizeChunker, RagError, RecursiveChunker, split,
    split_text,
};
use veritas_telemetry::{EventStorage, capture_subscriber};

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Text over a tiny alphabet so every separator level gets exercised.
fn arb_text() -> impl Strategy<Value = String> {
    "[ab é.\n]{0,240}"
}

fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

mod prop_split {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Chunks stay within `chunk_size` whenever a separator could split them.
        #[test]
        fn chunks_are_bounded(text in arb_text(), (size, overlap) in arb_sizes()) {
            for segment in split(&text, size, overlap, &DEFAULT_SEPARATORS).unwrap() {
                prop_assert!(!segment.hard_cut);
                prop_assert!(char_len(&segment.text) <= size);
            }
        }

        /// Each chunk is the exact source slice named by its span.
        #[test]
        fn spans_point_at_chunk_text(text in arb_text(), (size, overlap) in arb_sizes()) {
            for segment in split(&text, size, overlap, &DEFAULT_SEPARATORS).unwrap() {
                prop_assert_eq!(&text[segment.span.clone()], segment.text.as_str());
                prop_assert!(!segment.text.is_empty());
                prop_assert_eq!(segment.text.trim(), segment.text.as_str());
            }
        }

        /// Advances tile the source, so the original can be rebuilt.
        #[test]
        fn advances_reconstruct_source(text in arb_text(), (size, overlap) in arb_sizes()) {
            let segments = split(&text, size, overlap, &DEFAULT_SEPARATORS).unwrap();
            if segments.is_empty() {
                prop_assert!(text.trim().is_empty());
            } else {
                let rebuilt: String =
                    segments.iter().map(|s| &text[s.advance.clone()]).collect();
                prop_assert_eq!(rebuilt, text);
            }
        }

        /// Neighbouring chunks share at most `chunk_overlap` characters.
        #[test]
        fn overlap_is_bounded(text in arb_text(), (size, overlap) in arb_sizes()) {
            let segments = split(&text, size, overlap, &DEFAULT_SEPARATORS).unwrap();
            for pair in segments.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                prop_assert!(next.span.start >= prev.span.start);
                if next.span.start < prev.span.end {
                    let shared = &text[next.span.start..prev.span.end.min(next.span.end)];
                    prop_assert!(char_len(shared) <= overlap);
                }
            }
        }

        /// Without overlap, no two neighbouring chunks could have been joined
        /// into one that fits.
        #[test]
        fn packing_is_greedy(
            words in proptest::collection::vec("[a-z]{1,6}", 1..40),
            size in 1usize..24,
        ) {
            let text = words.join(",");
            let segments = split(&text, size, 0, &[","]).unwrap();
            for pair in segments.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                if prev.hard_cut || next.hard_cut {
                    continue;
                }
                prop_assert!(char_len(&prev.text) + 1 + char_len(&next.text) > size);
            }
        }

        /// Separators absent from the text only add hard cuts, never gaps.
        #[test]
        fn custom_separators_keep_spans_exact(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let separators = [". ", "\n"];
            for segment in split(&text, size, overlap, &separators).unwrap() {
                prop_assert_eq!(&text[segment.span.clone()], segment.text.as_str());
                if !segment.hard_cut {
                    prop_assert!(char_len(&segment.text) <= size);
                }
            }
        }
    }
}

#[test]
fn sentence_separator_scenario() {
    let chunks = split_text("A. B. C.", 4, 0, &[". "]).unwrap();
    assert_eq!(chunks, vec!["A.", "B.", "C."]);
}

#[test]
fn packs_words_up_to_chunk_size() {
    let chunks = split_text("A B C D E", 3, 0, &[" ", ""]).unwrap();
    assert_eq!(chunks, vec!["A B", "C D", "E"]);
}

#[test]
fn piece_that_fits_without_its_separator_is_not_a_hard_cut() {
    let segments = split("a,b,c", 1, 0, &[","]).unwrap();
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert!(segments.iter().all(|s| !s.hard_cut));
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(split("", 10, 2, &DEFAULT_SEPARATORS).unwrap().is_empty());
    assert!(split(" \n\n ", 10, 2, &DEFAULT_SEPARATORS).unwrap().is_empty());
}

#[test]
fn zero_chunk_size_is_rejected() {
    let err = split("anything", 0, 0, &DEFAULT_SEPARATORS).unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}

#[test]
fn short_text_is_one_chunk() {
    let chunks = split_text("  Claim rated false.  ", 100, 10, &DEFAULT_SEPARATORS).unwrap();
    assert_eq!(chunks, vec!["Claim rated false."]);
}

#[test]
fn prefers_paragraph_breaks() {
    let text = "First paragraph here.\n\nSecond paragraph here.";
    let chunks = split_text(text, 25, 0, &DEFAULT_SEPARATORS).unwrap();
    assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
}

#[test]
fn unsplittable_piece_is_hard_cut() {
    let segments = split("abcdefgh ij", 4, 0, &[" "]).unwrap();
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["abcdefgh", "ij"]);
    assert!(segments[0].hard_cut);
    assert!(!segments[1].hard_cut);
}

#[test]
fn hard_cut_is_logged() {
    let storage = EventStorage::new();
    tracing::subscriber::with_default(capture_subscriber(storage.clone()), || {
        split("abcdefgh ij", 4, 0, &[" "]).unwrap();
    });
    let warnings = storage.at_level(tracing::Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("chunk_size"), Some(&serde_json::json!(4)));
    assert_eq!(warnings[0].field("chunk_len"), Some(&serde_json::json!(8)));
}

#[test]
fn long_input_does_not_recurse_deeply() {
    let text = "x".repeat(50_000);
    let segments = split(&text, 7, 3, &DEFAULT_SEPARATORS).unwrap();
    assert!(segments.iter().all(|s| char_len(&s.text) <= 7));
    let rebuilt: String = segments.iter().map(|s| &text[s.advance.clone()]).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn recursive_chunker_builds_chunk_records() {
    let doc = Document::new("pf-7", "Bats are not blind. They see well at dusk.")
        .with_metadata("claim", "Bats are blind")
        .with_source_uri("https://example.org/bats");
    let chunks = RecursiveChunker::new(20, 5).chunk(&doc).unwrap();

    assert!(chunks.len() > 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.id, format!("pf-7_{i}"));
        assert_eq!(chunk.document_id, "pf-7");
        assert_eq!(chunk.sequence_index, i);
        assert_eq!(&doc.text[chunk.span.clone()], chunk.text);
        assert_eq!(chunk.metadata.get("chunk_index"), Some(&i.to_string()));
        assert_eq!(chunk.metadata.get("claim").map(String::as_str), Some("Bats are blind"));
        assert_eq!(chunk.source_url(), Some("https://example.org/bats"));
        assert!(!chunk.oversized);
    }
}

#[test]
fn recursive_chunker_flags_oversized_chunks() {
    let doc = Document::new("d", "supercalifragilistic word");
    let chunks = RecursiveChunker::new(8, 0).with_separators([" "]).chunk(&doc).unwrap();
    assert!(chunks[0].oversized);
    assert_eq!(chunks[0].text, "supercalifragilistic");
    assert!(!chunks[1].oversized);
}

#[test]
fn fixed_size_chunker_windows_by_chars() {
    let doc = Document::new("d", "abcdefghij");
    let texts: Vec<String> =
        FixedSizeChunker::new(4, 1).chunk(&doc).unwrap().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["abcd", "defg", "ghij"]);

    assert!(FixedSizeChunker::new(4, 1).chunk(&Document::new("e", "")).unwrap().is_empty());
    assert!(FixedSizeChunker::new(0, 0).chunk(&doc).is_err());
}
