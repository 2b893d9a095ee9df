//! Audio capture and WAV preparation.

pub mod mic_source;
pub mod wav;

pub use mic_source::MicSource;

/// Sample rate the transcription service receives, for both the live
/// stream and normalized uploads.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
