use crate::error::MeetscribeError;
use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deepgram: DeepgramConfig,
    pub openai: OpenAiConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepgramConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// BCP-47 language code sent to the transcription service
    /// (speech language, not the minutes language).
    pub language: String,
    pub api_endpoint: Option<String>,
    /// WebSocket endpoint for live transcription.
    pub live_endpoint: Option<String>,
    /// Timeout in seconds for a prerecorded transcription request.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: Option<String>,
    /// Timeout in seconds for a chat-completion request.
    pub request_timeout_seconds: u64,
    /// Attempts for minutes generation (immediate retries, no backoff).
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for transcripts and minutes. Empty means the default
    /// data directory.
    pub dir: String,
    /// Keep the normalized temp WAV after an upload run.
    pub keep_normalized_audio: bool,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "nova-2".to_string(),
            language: "en".to_string(),
            api_endpoint: None,
            live_endpoint: None,
            request_timeout_seconds: 300,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            api_endpoint: None,
            request_timeout_seconds: 120,
            max_attempts: 3,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            keep_normalized_audio: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config.with_env_overrides());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config.with_env_overrides())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Environment variables take precedence over the config file so keys
    /// never have to be written to disk.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY") {
            if !key.is_empty() {
                self.deepgram.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai.api_key = Some(key);
            }
        }
        self
    }

    /// The transcription API key, failing before any network activity.
    pub fn deepgram_api_key(&self) -> Result<&str, MeetscribeError> {
        match self.deepgram.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(MeetscribeError::MissingCredential("DEEPGRAM_API_KEY")),
        }
    }

    /// The summarization API key, failing before any network activity.
    pub fn openai_api_key(&self) -> Result<&str, MeetscribeError> {
        match self.openai.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(MeetscribeError::MissingCredential("OPENAI_API_KEY")),
        }
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        if self.output.dir.is_empty() {
            global::output_dir()
        } else {
            Ok(PathBuf::from(&self.output.dir))
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
