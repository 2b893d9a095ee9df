//! Batch speech-to-text abstraction.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::transcript::Word;

mod deepgram;

pub use deepgram::DeepgramBatchClient;

/// Prerecorded transcription: one audio file in, diarized words out.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transcribe an audio file, returning the ordered diarized word
    /// sequence. `language` is a BCP-47 code; empty or "auto" lets the
    /// service detect.
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<Word>>;
}
