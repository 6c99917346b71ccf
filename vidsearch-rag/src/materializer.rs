//! Reconstructing spoken text for a time range from word timestamps.

use serde::{Deserialize, Serialize};

use crate::retriever::ScoredChapter;
use crate::transcript::{Transcript, Word};

/// Join the words lying entirely inside `[start, end]` with single spaces.
///
/// A word straddling either boundary is excluded. Returns an empty string when
/// no word qualifies.
pub fn excerpt(words: &[Word], start: f64, end: f64) -> String {
    words
        .iter()
        .filter(|word| word.start >= start && word.end <= end)
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Transcript {
    /// The spoken text between `start` and `end` seconds.
    pub fn excerpt(&self, start: f64, end: f64) -> String {
        excerpt(&self.words, start, end)
    }
}

/// A chapter prepared for display, with its spoken text and search relevance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterExcerpt {
    /// Chapter headline, or `Chapter {n}` when the headline is blank.
    pub title: String,
    /// Chapter summary.
    pub summary: String,
    /// Start in seconds.
    pub start: f64,
    /// End in seconds.
    pub end: f64,
    /// Words spoken during the chapter.
    pub transcript: String,
    /// Whether the chapter was among the search's top chapters.
    pub is_relevant: bool,
    /// The relevance score, when relevant.
    pub relevance_score: Option<i64>,
}

/// Prepare every chapter of `transcript`, marking those present in `matched`.
///
/// Chapters are matched on their exact `(start, end)` pair.
pub fn annotate_chapters(
    transcript: &Transcript,
    matched: &[ScoredChapter],
) -> Vec<ChapterExcerpt> {
    transcript
        .chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let score = matched
                .iter()
                .find(|m| m.start == chapter.start && m.end == chapter.end)
                .map(|m| m.score);
            let title = if chapter.headline.trim().is_empty() {
                format!("Chapter {}", i + 1)
            } else {
                chapter.headline.clone()
            };

            ChapterExcerpt {
                title,
                summary: chapter.summary.clone(),
                start: chapter.start,
                end: chapter.end,
                transcript: transcript.excerpt(chapter.start, chapter.end),
                is_relevant: score.is_some(),
                relevance_score: score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Chapter;

    fn words() -> Vec<Word> {
        vec![Word::new("hi", 0.0, 1.0), Word::new("there", 1.0, 2.0), Word::new("bye", 5.0, 6.0)]
    }

    #[test]
    fn selects_contained_words_in_order() {
        assert_eq!(excerpt(&words(), 0.0, 2.0), "hi there");
    }

    #[test]
    fn empty_range_yields_empty_string() {
        assert_eq!(excerpt(&words(), 10.0, 20.0), "");
        assert_eq!(excerpt(&[], 0.0, 100.0), "");
    }

    #[test]
    fn straddling_words_are_excluded() {
        assert_eq!(excerpt(&words(), 0.5, 6.0), "there bye");
        assert_eq!(excerpt(&words(), 0.0, 5.5), "hi there");
    }

    #[test]
    fn annotates_every_chapter_and_marks_matches() {
        let transcript = Transcript {
            id: "t1".into(),
            user_id: "u1".into(),
            text: "hi there bye".into(),
            words: words(),
            chapters: vec![
                Chapter {
                    headline: "Greeting".into(),
                    summary: "s1".into(),
                    gist: "g1".into(),
                    start: 0.0,
                    end: 2.0,
                },
                Chapter {
                    headline: " ".into(),
                    summary: "s2".into(),
                    gist: "g2".into(),
                    start: 4.0,
                    end: 6.0,
                },
            ],
        };
        let matched =
            [ScoredChapter { content: "Greeting".into(), start: 0.0, end: 2.0, score: 4 }];

        let chapters = annotate_chapters(&transcript, &matched);

        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].is_relevant);
        assert_eq!(chapters[0].relevance_score, Some(4));
        assert_eq!(chapters[0].transcript, "hi there");
        assert_eq!(chapters[1].title, "Chapter 2");
        assert!(!chapters[1].is_relevant);
        assert_eq!(chapters[1].relevance_score, None);
        assert_eq!(chapters[1].transcript, "bye");
    }
}
