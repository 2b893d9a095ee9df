//! Meeting pipeline orchestrator.
//!
//! Upload mode: normalize, transcribe, segment, translate, generate
//! minutes, save. Live mode: capture, stream, aggregate, save the
//! transcript. Service clients are injected at construction.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audio::wav::normalize_wav;
use crate::error::MeetscribeError;
use crate::minutes::{MinutesLanguage, MinutesService};
use crate::stt::SpeechToText;
use crate::transcript::{render, segment};

/// Result of a completed upload run.
#[derive(Debug)]
pub struct UploadOutcome {
    pub transcript: String,
    pub minutes: String,
    pub transcript_path: PathBuf,
    pub minutes_path: PathBuf,
}

pub struct MeetingPipeline {
    stt: Box<dyn SpeechToText>,
    minutes: Box<dyn MinutesService>,
    speech_language: String,
    output_dir: PathBuf,
    keep_normalized_audio: bool,
}

impl MeetingPipeline {
    pub fn new(
        stt: Box<dyn SpeechToText>,
        minutes: Box<dyn MinutesService>,
        speech_language: String,
        output_dir: PathBuf,
        keep_normalized_audio: bool,
    ) -> Self {
        Self {
            stt,
            minutes,
            speech_language,
            output_dir,
            keep_normalized_audio,
        }
    }

    /// Transcribe an uploaded recording and generate minutes from it.
    pub async fn run_upload(
        &self,
        audio_path: &Path,
        language: MinutesLanguage,
    ) -> Result<UploadOutcome> {
        if !audio_path.exists() {
            bail!("Audio file not found: {:?}", audio_path);
        }

        // WAV inputs get downmixed/resampled; anything else uploads as-is.
        let normalized = normalize_wav(audio_path)?;
        let upload_path = normalized
            .as_ref()
            .map(|temp| temp.path().to_path_buf())
            .unwrap_or_else(|| audio_path.to_path_buf());

        let words = self
            .stt
            .transcribe(&upload_path, &self.speech_language)
            .await
            .context("Transcription failed")?;

        if let Some(temp) = normalized {
            if self.keep_normalized_audio {
                let kept = timestamped_path(&self.output_dir, "normalized", "wav");
                if let Some(parent) = kept.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                match temp.persist(&kept) {
                    Ok(_) => info!("Normalized audio kept at {:?}", kept),
                    Err(e) => warn!("Failed to keep normalized audio: {}", e),
                }
            }
        }

        if words.is_empty() {
            warn!("Transcription produced no words; nothing to summarize");
            return Err(MeetscribeError::EmptyResult("transcription").into());
        }

        let turns = segment(&words);
        let mut transcript = render(&turns);
        info!(
            "Transcript assembled: {} words across {} turns",
            words.len(),
            turns.len()
        );

        // Non-English runs get the transcript rewritten in the target
        // language with speaker ids replaced by names.
        transcript = self
            .minutes
            .translate(&transcript, language)
            .await
            .context("Translation failed")?;

        let minutes = self
            .minutes
            .generate(&transcript, language)
            .await
            .context("Minutes generation failed")?;

        let transcript_path = write_output(&self.output_dir, "transcript", "txt", &transcript)?;
        let minutes_path = write_output(&self.output_dir, "minutes", "txt", &minutes)?;

        Ok(UploadOutcome {
            transcript,
            minutes,
            transcript_path,
            minutes_path,
        })
    }
}

/// Save a live session's finalized utterances, one per line.
pub fn save_live_transcript(output_dir: &Path, utterances: &[String]) -> Result<Option<PathBuf>> {
    if utterances.is_empty() {
        warn!("Live session produced no finalized utterances; nothing saved");
        return Ok(None);
    }

    let content = utterances.join("\n");
    let path = write_output(output_dir, "transcript", "txt", &content)?;
    Ok(Some(path))
}

fn write_output(output_dir: &Path, prefix: &str, ext: &str, content: &str) -> Result<PathBuf> {
    let path = timestamped_path(output_dir, prefix, ext);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;

    info!("Saved {} ({} chars) to {:?}", prefix, content.len(), path);
    Ok(path)
}

fn timestamped_path(output_dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = format!("{}-{}.{}", prefix, timestamp, ext);
    let path = output_dir.join(&filename);

    // Handle collision by appending counter
    if path.exists() {
        for i in 1..100 {
            let filename = format!("{}-{}-{}.{}", prefix, timestamp, i, ext);
            let alt_path = output_dir.join(&filename);
            if !alt_path.exists() {
                return alt_path;
            }
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Word;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeStt {
        words: Vec<Word>,
    }

    #[async_trait]
    impl SpeechToText for FakeStt {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn transcribe(&self, _audio_path: &Path, _language: &str) -> Result<Vec<Word>> {
            Ok(self.words.clone())
        }
    }

    struct FakeMinutes {
        generate_calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl MinutesService for FakeMinutes {
        async fn translate(&self, transcript: &str, language: MinutesLanguage) -> Result<String> {
            if language == MinutesLanguage::English {
                Ok(transcript.to_string())
            } else {
                Ok(format!("[{}] {}", language, transcript))
            }
        }

        async fn generate(&self, transcript: &str, _language: MinutesLanguage) -> Result<String> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("MINUTES OF: {}", transcript))
        }
    }

    fn pipeline(words: Vec<Word>, output_dir: &Path) -> (MeetingPipeline, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = MeetingPipeline::new(
            Box::new(FakeStt { words }),
            Box::new(FakeMinutes {
                generate_calls: calls.clone(),
            }),
            "en".to_string(),
            output_dir.to_path_buf(),
            false,
        );
        (pipeline, calls)
    }

    fn fake_audio(dir: &Path) -> PathBuf {
        let path = dir.join("meeting.mp3");
        std::fs::write(&path, b"fake audio").unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_produces_transcript_and_minutes_files() {
        let dir = tempfile::tempdir().unwrap();
        let audio = fake_audio(dir.path());
        let (pipeline, calls) = pipeline(
            vec![
                Word::new(0, "Hi"),
                Word::new(0, "there."),
                Word::new(1, "Hello."),
            ],
            dir.path(),
        );

        let outcome = pipeline
            .run_upload(&audio, MinutesLanguage::English)
            .await
            .unwrap();

        assert_eq!(outcome.transcript, "SPEAKER 0: Hi there.\n\nSPEAKER 1: Hello.");
        assert!(outcome.minutes.starts_with("MINUTES OF:"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let saved = std::fs::read_to_string(&outcome.transcript_path).unwrap();
        assert_eq!(saved, outcome.transcript);
        assert!(outcome.minutes_path.exists());
    }

    #[tokio::test]
    async fn test_upload_translates_before_summarizing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = fake_audio(dir.path());
        let (pipeline, _) = pipeline(vec![Word::new(0, "Konnichiwa.")], dir.path());

        let outcome = pipeline
            .run_upload(&audio, MinutesLanguage::Japanese)
            .await
            .unwrap();

        assert!(outcome.transcript.starts_with("[Japanese]"));
        assert!(outcome.minutes.contains("[Japanese]"));
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(vec![Word::new(0, "x")], dir.path());

        let err = pipeline
            .run_upload(Path::new("/nonexistent/meeting.wav"), MinutesLanguage::English)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_upload_empty_transcription_fails_without_summarizing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = fake_audio(dir.path());
        let (pipeline, calls) = pipeline(Vec::new(), dir.path());

        let err = pipeline
            .run_upload(&audio, MinutesLanguage::English)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeetscribeError>(),
            Some(MeetscribeError::EmptyResult("transcription"))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_save_live_transcript_joins_utterances_with_newlines() {
        let dir = tempfile::tempdir().unwrap();

        let path = save_live_transcript(dir.path(), &["first".to_string(), "second".to_string()])
            .unwrap()
            .expect("non-empty session saves a file");

        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_save_live_transcript_empty_session_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_live_transcript(dir.path(), &[]).unwrap().is_none());
    }

    #[test]
    fn test_timestamped_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();

        let first = timestamped_path(dir.path(), "transcript", "txt");
        std::fs::write(&first, "taken").unwrap();
        let second = timestamped_path(dir.path(), "transcript", "txt");

        assert_ne!(first, second);
    }
}
