//! Deepgram prerecorded transcription client.
//!
//! One POST to `/v1/listen` with the audio bytes as the body; diarization,
//! punctuation and smart formatting are requested so the response carries
//! speaker-tagged punctuated words.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use super::SpeechToText;
use crate::error::MeetscribeError;
use crate::transcript::{words_from_raw, RawWord, Word};

/// Prerecorded transcription response. Only the fields the turn
/// segmenter depends on are modeled; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    results: TranscriptionResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResults {
    channels: Vec<ChannelResult>,
}

#[derive(Debug, Deserialize)]
struct ChannelResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    err_msg: String,
}

impl TranscriptionResponse {
    /// The word sequence of the first channel's best alternative.
    fn into_raw_words(self) -> Result<Vec<RawWord>> {
        let alternative = self
            .results
            .channels
            .into_iter()
            .next()
            .context("Transcription response has no channels")?
            .alternatives
            .into_iter()
            .next()
            .context("Transcription response has no alternatives")?;

        Ok(alternative.words)
    }
}

pub struct DeepgramBatchClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepgramBatchClient {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = endpoint.unwrap_or_else(|| "https://api.deepgram.com/v1".to_string());

        info!("Initialized Deepgram client with base URL: {}", base_url);

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }

    fn request_url(&self, language: &str) -> String {
        let mut url = format!(
            "{}/listen?model={}&smart_format=true&punctuate=true&diarize=true&utterances=true",
            self.base_url, self.model
        );
        if !language.is_empty() && language != "auto" {
            url.push_str("&language=");
            url.push_str(language);
        }
        url
    }

    async fn submit(&self, audio_path: &Path, language: &str) -> Result<TranscriptionResponse> {
        let url = self.request_url(language);

        let audio_data = tokio::fs::read(audio_path)
            .await
            .context("Failed to read audio file")?;

        debug!(
            "Uploading {} bytes to Deepgram for transcription",
            audio_data.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type_for(audio_path))
            .body(audio_data)
            .send()
            .await
            .context("Failed to submit audio to Deepgram")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read transcription response body")?;

        if !status.is_success() {
            error!(
                "Deepgram transcription failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(MeetscribeError::external("Deepgram", error_response.err_msg).into());
            }

            return Err(MeetscribeError::external(
                "Deepgram",
                format!("status {}: {}", status, response_text),
            )
            .into());
        }

        serde_json::from_str(&response_text).context("Failed to parse transcription response")
    }
}

#[async_trait]
impl SpeechToText for DeepgramBatchClient {
    fn name(&self) -> &'static str {
        "Deepgram"
    }

    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<Word>> {
        info!("Transcribing audio file via Deepgram: {:?}", audio_path);

        let response = self.submit(audio_path, language).await?;
        let raw_words = response.into_raw_words()?;

        info!("Transcription complete: {} words", raw_words.len());
        Ok(words_from_raw(&raw_words)?)
    }
}

/// MIME type for the upload body. Deepgram sniffs containers itself, so
/// octet-stream is a safe default for anything unrecognized.
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_extracts_words() {
        let body = r#"{
            "metadata": {"request_id": "abc"},
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "Hi there. Hello.",
                        "confidence": 0.98,
                        "words": [
                            {"word": "hi", "punctuated_word": "Hi", "speaker": 0, "start": 0.1, "end": 0.3, "confidence": 0.99},
                            {"word": "there", "punctuated_word": "there.", "speaker": 0, "start": 0.3, "end": 0.5, "confidence": 0.97},
                            {"word": "hello", "punctuated_word": "Hello.", "speaker": 1, "start": 0.9, "end": 1.2, "confidence": 0.95}
                        ]
                    }]
                }]
            }
        }"#;

        let response: TranscriptionResponse = serde_json::from_str(body).unwrap();
        let raw = response.into_raw_words().unwrap();
        assert_eq!(raw.len(), 3);

        let words = words_from_raw(&raw).unwrap();
        assert_eq!(words[0].speaker, 0);
        assert_eq!(words[0].text, "Hi");
        assert_eq!(words[2].speaker, 1);
    }

    #[test]
    fn test_response_without_channels_is_error() {
        let body = r#"{"results": {"channels": []}}"#;
        let response: TranscriptionResponse = serde_json::from_str(body).unwrap();
        assert!(response.into_raw_words().is_err());
    }

    #[test]
    fn test_undiarized_words_fail_validation() {
        let body = r#"{
            "results": {
                "channels": [{
                    "alternatives": [{
                        "words": [{"word": "hi", "punctuated_word": "Hi"}]
                    }]
                }]
            }
        }"#;
        let response: TranscriptionResponse = serde_json::from_str(body).unwrap();
        let raw = response.into_raw_words().unwrap();
        assert!(words_from_raw(&raw).is_err());
    }

    #[test]
    fn test_request_url_includes_options() {
        let client = DeepgramBatchClient::new(
            "key".to_string(),
            None,
            "nova-2".to_string(),
            Duration::from_secs(300),
        )
        .unwrap();

        let url = client.request_url("en");
        assert!(url.starts_with("https://api.deepgram.com/v1/listen?"));
        assert!(url.contains("model=nova-2"));
        assert!(url.contains("diarize=true"));
        assert!(url.contains("punctuate=true"));
        assert!(url.contains("smart_format=true"));
        assert!(url.contains("language=en"));
    }

    #[test]
    fn test_request_url_auto_language_omitted() {
        let client = DeepgramBatchClient::new(
            "key".to_string(),
            None,
            "nova-2".to_string(),
            Duration::from_secs(300),
        )
        .unwrap();

        assert!(!client.request_url("auto").contains("language="));
        assert!(!client.request_url("").contains("language="));
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for(Path::new("a.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("a.xyz")), "application/octet-stream");
    }
}
