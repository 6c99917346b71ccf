//! Token-budgeted text chunking.
//!
//! This module provides the [`Chunker`] trait and [`TokenBudgetChunker`], which
//! splits text into contiguous segments that fit an approximate token budget,
//! preferring to cut after a sentence terminator, then at a space.

/// Approximate number of characters per token for natural-language text.
///
/// This is a heuristic, not a tokenizer; it holds well enough for English
/// transcripts to keep chunks under embedding model input limits.
pub const CHARS_PER_TOKEN: usize = 4;

/// Token budget for chunks of a full transcript.
pub const DEFAULT_TRANSCRIPT_MAX_TOKENS: usize = 7000;

/// Token budget for chunks of a chapter's derived text.
pub const DEFAULT_CHAPTER_MAX_TOKENS: usize = 6000;

/// Characters that end a sentence.
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// A strategy for splitting text into ordered chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered, trimmed chunks.
    ///
    /// Always returns at least one element. Chunks may be empty strings for
    /// degenerate input (blank text, whitespace-only segments).
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text greedily into segments of at most `max_tokens * CHARS_PER_TOKEN`
/// characters.
///
/// For each segment the cut point is chosen, in order of preference:
///
/// 1. just after the last `.`, `!` or `?` inside the segment,
/// 2. at the last space inside the segment,
/// 3. exactly at the budget boundary (may split a word),
///
/// where options 1 and 2 only apply when the boundary lies in the second half
/// of the segment. Every segment is trimmed; no other characters are dropped.
///
/// # Example
///
/// ```rust,ignore
/// use vidsearch_rag::TokenBudgetChunker;
///
/// let chunker = TokenBudgetChunker::new(7000);
/// let chunks = chunker.chunk(&transcript.text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudgetChunker {
    max_tokens: usize,
}

impl TokenBudgetChunker {
    /// Create a chunker for the given token budget.
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Chunker using the transcript budget.
    pub fn for_transcripts() -> Self {
        Self::new(DEFAULT_TRANSCRIPT_MAX_TOKENS)
    }

    /// Chunker using the chapter budget.
    pub fn for_chapters() -> Self {
        Self::new(DEFAULT_CHAPTER_MAX_TOKENS)
    }

    /// The configured token budget.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Maximum number of characters per chunk. Never zero.
    pub fn char_budget(&self) -> usize {
        self.max_tokens.saturating_mul(CHARS_PER_TOKEN).max(1)
    }
}

impl Default for TokenBudgetChunker {
    fn default() -> Self {
        Self::for_transcripts()
    }
}

impl Chunker for TokenBudgetChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let budget = self.char_budget();

        // Byte offset of every char position, plus the end of the text.
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_len = offsets.len() - 1;

        if char_len <= budget {
            return vec![text.trim().to_string()];
        }

        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut cursor = 0;

        while cursor < char_len {
            let mut end = cursor + budget;
            if end < char_len {
                end = find_cut(&chars, cursor, end, budget.div_ceil(2));
            } else {
                end = char_len;
            }

            chunks.push(text[offsets[cursor]..offsets[end]].trim().to_string());
            cursor = end;
        }

        chunks
    }
}

/// Choose where to cut a segment starting at `start` whose tentative end is `end`.
///
/// Boundaries before `start + min_len` are ignored so every cut makes progress
/// of at least half a budget.
fn find_cut(chars: &[char], start: usize, end: usize, min_len: usize) -> usize {
    let floor = start + min_len;

    // Cutting after a terminator at `end - 1` yields exactly `end`.
    let terminator =
        (floor..end).rev().find(|&i| SENTENCE_TERMINATORS.contains(&chars[i]));
    if let Some(pos) = terminator {
        return pos + 1;
    }

    // The space itself is left at the head of the next segment and trimmed.
    let space = (floor..=end).rev().find(|&i| chars[i] == ' ');
    if let Some(pos) = space {
        return pos;
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunker = TokenBudgetChunker::new(10);
        assert_eq!(chunker.chunk("  hello world \n"), vec!["hello world"]);
    }

    #[test]
    fn empty_text_is_a_single_empty_chunk() {
        let chunker = TokenBudgetChunker::new(10);
        assert_eq!(chunker.chunk(""), vec![String::new()]);
    }

    #[test]
    fn prefers_sentence_boundary_in_second_half() {
        // budget = 2 tokens * 4 = 8 chars
        let chunker = TokenBudgetChunker::new(2);
        let chunks = chunker.chunk("Hi you. Then more text");
        assert_eq!(chunks[0], "Hi you.");
    }

    #[test]
    fn ignores_sentence_boundary_in_first_half() {
        // '.' at index 1 is before the 50% mark of an 8 char budget.
        let chunker = TokenBudgetChunker::new(2);
        let chunks = chunker.chunk("A. bcdef ghijkl");
        assert_eq!(chunks[0], "A. bcdef");
    }

    #[test]
    fn falls_back_to_hard_cut_without_boundaries() {
        let chunker = TokenBudgetChunker::new(1);
        let chunks = chunker.chunk("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn cuts_on_char_boundaries_for_multibyte_text() {
        let chunker = TokenBudgetChunker::new(1);
        let chunks = chunker.chunk("ééééééééé");
        assert_eq!(chunks, vec!["éééé", "éééé", "é"]);
    }

    #[test]
    fn whitespace_only_segment_yields_empty_chunk() {
        let chunker = TokenBudgetChunker::new(1);
        let chunks = chunker.chunk("abcd    efgh");
        assert_eq!(chunks, vec!["abcd", "", "efg", "h"]);
    }

    #[test]
    fn zero_budget_still_terminates() {
        let chunker = TokenBudgetChunker::new(0);
        assert_eq!(chunker.char_budget(), 1);
        assert_eq!(chunker.chunk("abc"), vec!["a", "b", "c"]);
    }
}
