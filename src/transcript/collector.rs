//! Fragment accumulator for live transcription.
//!
//! One collector exists per live session, owned by a single driver loop.
//! Fragments accumulate between speech-final signals; `finalize`
//! snapshots and clears in one step, so state is already reset by the
//! time the finalized utterance reaches any downstream consumer.

/// Accumulates transcript fragments into one utterance at a time.
#[derive(Debug, Default)]
pub struct TranscriptCollector {
    fragments: Vec<String>,
}

impl TranscriptCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Whitespace-only input is a no-op. Fragments are
    /// stored trimmed so joining never produces doubled spaces.
    pub fn add_fragment(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.fragments.push(trimmed.to_string());
    }

    /// Space-join everything collected since the last finalize, then clear.
    /// A second consecutive call returns the empty string.
    pub fn finalize(&mut self) -> String {
        let utterance = self.fragments.join(" ");
        self.fragments.clear();
        utterance
    }

    /// Discard accumulated fragments (cancellation or explicit restart).
    pub fn reset(&mut self) {
        self.fragments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
