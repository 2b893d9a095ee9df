//! Minutes-of-meeting generation and transcript translation.
//!
//! Prompts are assembled deterministically from the transcript, the
//! target language, and today's date; the language model response is
//! treated as an opaque text blob.

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use tracing::info;

use crate::error::MeetscribeError;

mod openai;
mod retry;

pub use openai::OpenAiClient;
pub use retry::call_with_retry;

/// Languages the minutes can be produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MinutesLanguage {
    English,
    Japanese,
}

impl MinutesLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Japanese => "Japanese",
        }
    }
}

impl std::fmt::Display for MinutesLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the summarization prompt. Embeds the transcript verbatim, the
/// target language, and the current date as DD-MM-YYYY.
pub fn build_minutes_prompt(transcript: &str, language: MinutesLanguage) -> String {
    let current_date = chrono::Local::now().format("%d-%m-%Y");

    format!(
        "You are a minutes-of-meeting generator. Take the conversation below, \
transcribed from a meeting, and generate the minutes of the meeting. Create a \
detailed table listing the tasks assigned to each person, the status of each \
task, and the deadlines. Write dates in the output table. \
Today is {current_date}. Identify the speaker names from the meeting transcript.

Generate the Minutes of Meeting in {language} only.
Format the output with clear sections:
- Meeting Date
- Attendees
- Meeting Agenda
- Discussion Points
- Task Assignments (in table format)
- Next Steps
- Meeting Conclusion

Transcript:
{transcript}",
        current_date = current_date,
        language = language,
        transcript = transcript,
    )
}

/// Build the translation prompt for a diarized transcript.
pub fn build_translation_prompt(transcript: &str, language: MinutesLanguage) -> String {
    format!(
        "Translate the following diarized output to {language}:

{transcript}

This is output text from a diarization model having multiple speakers. \
Find the person names from the output text given here and replace speaker ids \
like SPEAKER 0, SPEAKER 1 with the corresponding person names. \
Generate complete words in {language}. Give the output in a conversational manner.",
        language = language,
        transcript = transcript,
    )
}

/// Summarization and translation operations, behind a seam so the
/// pipeline can be exercised without network access.
#[async_trait]
pub trait MinutesService: Send + Sync {
    /// Translate a transcript into the target language. English input
    /// passes through unchanged.
    async fn translate(&self, transcript: &str, language: MinutesLanguage) -> Result<String>;

    /// Generate minutes of meeting from a transcript.
    async fn generate(&self, transcript: &str, language: MinutesLanguage) -> Result<String>;
}

pub struct MinutesGenerator {
    client: OpenAiClient,
    max_attempts: u32,
}

impl MinutesGenerator {
    pub fn new(client: OpenAiClient, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts,
        }
    }
}

#[async_trait]
impl MinutesService for MinutesGenerator {
    async fn translate(&self, transcript: &str, language: MinutesLanguage) -> Result<String> {
        if language == MinutesLanguage::English {
            return Ok(transcript.to_string());
        }

        info!("Translating transcript to {}", language);
        let prompt = build_translation_prompt(transcript, language);
        let translated = self.client.complete(&prompt, 2000, 0.7).await?;

        if translated.trim().is_empty() {
            return Err(MeetscribeError::EmptyResult("translation").into());
        }

        Ok(translated)
    }

    async fn generate(&self, transcript: &str, language: MinutesLanguage) -> Result<String> {
        info!("Generating minutes of meeting in {}", language);
        let prompt = build_minutes_prompt(transcript, language);

        let minutes = call_with_retry(self.max_attempts, || {
            self.client.complete(&prompt, 1500, 0.7)
        })
        .await?;

        if minutes.trim().is_empty() {
            return Err(MeetscribeError::EmptyResult("minutes generation").into());
        }

        info!("Minutes generated: {} chars", minutes.len());
        Ok(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_prompt_embeds_transcript_and_language() {
        let transcript = "SPEAKER 0: We ship on Friday.";
        let prompt = build_minutes_prompt(transcript, MinutesLanguage::Japanese);

        assert!(prompt.contains(transcript));
        assert!(prompt.contains("Japanese"));
        assert!(prompt.contains("Task Assignments"));
    }

    #[test]
    fn test_minutes_prompt_embeds_todays_date() {
        let prompt = build_minutes_prompt("t", MinutesLanguage::English);
        let today = chrono::Local::now().format("%d-%m-%Y").to_string();
        assert!(prompt.contains(&today));
    }

    #[test]
    fn test_translation_prompt_mentions_speaker_ids() {
        let prompt = build_translation_prompt("SPEAKER 0: hi", MinutesLanguage::Japanese);
        assert!(prompt.contains("SPEAKER 0"));
        assert!(prompt.contains("Japanese"));
    }

    #[test]
    fn test_language_display() {
        assert_eq!(MinutesLanguage::English.to_string(), "English");
        assert_eq!(MinutesLanguage::Japanese.to_string(), "Japanese");
    }
}
