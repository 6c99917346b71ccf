//! Transcript data model: time-stamped words and chapters.

use serde::{Deserialize, Serialize};

/// Separator placed between a chapter's headline, summary and gist.
const CHAPTER_TEXT_SEPARATOR: &str = "\n";

/// A single transcribed word with its offsets in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    /// The spoken text of the word.
    pub text: String,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self { text: text.into(), start, end }
    }
}

/// An automatically detected chapter of a transcript.
///
/// Chapters within one transcript are non-overlapping and ordered by `start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    /// Short headline for the chapter.
    pub headline: String,
    /// Multi-sentence summary.
    pub summary: String,
    /// A few words capturing the chapter's topic.
    pub gist: String,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
}

impl Chapter {
    /// The text written to the chapter collection: headline, summary and gist.
    pub fn indexed_text(&self) -> String {
        [self.headline.as_str(), self.summary.as_str(), self.gist.as_str()]
            .join(CHAPTER_TEXT_SEPARATOR)
    }
}

/// A completed transcript as produced by the transcription engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    /// Identifier assigned by the transcription engine.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Full transcript text.
    #[serde(default)]
    pub text: String,
    /// Word-level timestamps, in spoken order.
    #[serde(default)]
    pub words: Vec<Word>,
    /// Chapters, ordered by start.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_text_joins_fields_with_newlines() {
        let chapter = Chapter {
            headline: "Intro".into(),
            summary: "We say hello.".into(),
            gist: "greeting".into(),
            start: 0.0,
            end: 12.5,
        };
        assert_eq!(chapter.indexed_text(), "Intro\nWe say hello.\ngreeting");
    }

    #[test]
    fn transcript_payload_tolerates_missing_collections() {
        let transcript: Transcript = serde_json::from_str(r#"{"id":"t1"}"#).unwrap();
        assert!(transcript.words.is_empty());
        assert!(transcript.chapters.is_empty());
        assert_eq!(transcript.text, "");
    }
}
