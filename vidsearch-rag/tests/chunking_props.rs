//! Property tests for token-budgeted chunking.

use proptest::prelude::*;
use vidsearch_rag::chunking::{CHARS_PER_TOKEN, Chunker, TokenBudgetChunker};
use vidsearch_rag::retriever::relevance_score;

/// Walk `text` and check every chunk appears in order, separated only by whitespace.
fn reconstructs(text: &str, chunks: &[String]) -> bool {
    let mut pos = 0;
    for chunk in chunks {
        let Some(offset) = text[pos..].find(chunk.as_str()) else {
            return false;
        };
        if !text[pos..pos + offset].trim().is_empty() {
            return false;
        }
        pos += offset + chunk.len();
    }
    text[pos..].trim().is_empty()
}

/// **Property: short text is one trimmed chunk**
/// *For any* text no longer than the character budget, chunking returns
/// exactly the trimmed text.
mod prop_single_chunk {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn text_within_budget_is_returned_trimmed(
            text in "[a-z .!?\n]{0,40}",
            max_tokens in 10usize..20,
        ) {
            let chunks = TokenBudgetChunker::new(max_tokens).chunk(&text);
            prop_assert_eq!(chunks, vec![text.trim().to_string()]);
        }
    }
}

/// **Property: chunks reconstruct the source and respect the budget**
/// *For any* text, concatenating the chunks in order reproduces the text up to
/// whitespace at split points, and no chunk exceeds `max_tokens * 4` chars.
mod prop_reconstruction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_ordered_trimmed_substrings(
            text in "[a-zé .!?]{0,300}",
            max_tokens in 1usize..12,
        ) {
            let chunks = TokenBudgetChunker::new(max_tokens).chunk(&text);

            prop_assert!(!chunks.is_empty());
            prop_assert!(
                reconstructs(&text, &chunks),
                "chunks {:?} do not rebuild {:?}",
                chunks,
                text
            );
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= max_tokens * CHARS_PER_TOKEN);
                prop_assert_eq!(chunk.trim(), chunk.as_str());
            }
        }

        #[test]
        fn chunking_is_deterministic(text in "[a-z .]{0,200}", max_tokens in 1usize..8) {
            let chunker = TokenBudgetChunker::new(max_tokens);
            prop_assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
        }
    }
}

/// **Property: relevance never increases with distance**
mod prop_relevance_monotonic {
    use super::*;

    proptest! {
        #[test]
        fn larger_distance_never_scores_higher(
            a in 0.0f64..3.0,
            b in 0.0f64..3.0,
            max in 1.0f64..3.0,
        ) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(relevance_score(near, max) >= relevance_score(far, max));
        }
    }
}
