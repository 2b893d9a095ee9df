//! Speaker-turn segmentation for diarized transcripts.
//!
//! The transcription service returns a flat, ordered list of words, each
//! tagged with a speaker id. This module folds that list into maximal
//! same-speaker runs and renders them as readable `SPEAKER n:` paragraphs
//! for downstream summarization.

use crate::error::MeetscribeError;
use serde::Deserialize;

pub mod collector;

pub use collector::TranscriptCollector;

/// A word record as delivered by the transcription service. Fields are
/// optional on the wire; [`Word::from_raw`] enforces the ones we need.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWord {
    pub word: Option<String>,
    pub punctuated_word: Option<String>,
    pub speaker: Option<u32>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A diarized word: speaker id plus punctuated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub speaker: u32,
    pub text: String,
}

impl Word {
    pub fn new(speaker: u32, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// Validate a raw wire record. `index` is the word's position in the
    /// response, reported when a required field is absent.
    pub fn from_raw(index: usize, raw: &RawWord) -> Result<Self, MeetscribeError> {
        let speaker = raw.speaker.ok_or(MeetscribeError::MalformedInput {
            index,
            field: "speaker",
        })?;

        // Prefer the punctuated form; fall back to the bare token.
        let text = raw
            .punctuated_word
            .as_ref()
            .or(raw.word.as_ref())
            .ok_or(MeetscribeError::MalformedInput {
                index,
                field: "punctuated_word",
            })?
            .clone();

        Ok(Self { speaker, text })
    }
}

/// A maximal run of consecutive words attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: u32,
    pub text: String,
}

/// Convert raw wire records into validated words, failing on the first
/// record that is missing a required field.
pub fn words_from_raw(raw_words: &[RawWord]) -> Result<Vec<Word>, MeetscribeError> {
    raw_words
        .iter()
        .enumerate()
        .map(|(index, raw)| Word::from_raw(index, raw))
        .collect()
}

/// Group an ordered word sequence into contiguous speaker turns.
///
/// A trailing turn is always emitted, so an empty input yields one
/// degenerate turn for speaker 0 with empty text (`SPEAKER 0:` when
/// rendered).
pub fn segment(words: &[Word]) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut current_speaker = words.first().map(|w| w.speaker).unwrap_or(0);
    let mut current_text = String::new();

    for word in words {
        if word.speaker == current_speaker {
            if !current_text.is_empty() {
                current_text.push(' ');
            }
            current_text.push_str(&word.text);
        } else {
            turns.push(Turn {
                speaker: current_speaker,
                text: current_text,
            });
            current_speaker = word.speaker;
            current_text = word.text.clone();
        }
    }

    turns.push(Turn {
        speaker: current_speaker,
        text: current_text,
    });

    turns
}

/// Render turns in the form consumed by the minutes prompt:
/// `SPEAKER n: text`, one blank line between turns.
pub fn render(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            if turn.text.is_empty() {
                format!("SPEAKER {}:", turn.speaker)
            } else {
                format!("SPEAKER {}: {}", turn.speaker, turn.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
