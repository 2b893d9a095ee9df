//! Typed messages from the live transcription stream.
//!
//! The service multiplexes transcript results and control/metadata
//! messages over one WebSocket, discriminated by a `type` field.

use serde::Deserialize;

/// Wire message from the streaming endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    #[serde(rename = "Results")]
    Results {
        #[serde(default)]
        is_final: bool,
        #[serde(default)]
        speech_final: bool,
        channel: StreamChannel,
    },
    #[serde(rename = "Metadata")]
    Metadata {
        #[serde(default)]
        request_id: Option<String>,
    },
    #[serde(rename = "SpeechStarted")]
    SpeechStarted {
        #[serde(default)]
        timestamp: f64,
    },
    #[serde(rename = "UtteranceEnd")]
    UtteranceEnd {
        #[serde(default)]
        last_word_end: f64,
    },
    #[serde(rename = "Error")]
    Error {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct StreamChannel {
    pub alternatives: Vec<StreamAlternative>,
}

#[derive(Debug, Deserialize)]
pub struct StreamAlternative {
    pub transcript: String,
}

/// Event consumed by the aggregator loop. One producer (the socket
/// reader task), one consumer, over an mpsc channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A recognition result. `is_final` means the result slot is settled;
    /// `speech_final` means the speaker stopped and the utterance should
    /// be emitted now.
    Transcript {
        text: String,
        is_final: bool,
        speech_final: bool,
    },
    SpeechStarted,
    UtteranceEnd,
    Metadata(String),
    /// A stream-level error. Logged; does not discard accumulated text.
    Error(String),
    /// End of stream. Terminal.
    Closed,
}

impl StreamMessage {
    /// Map a wire message to an aggregator event. Unknown message types
    /// map to nothing.
    pub fn into_event(self) -> Option<LiveEvent> {
        match self {
            StreamMessage::Results {
                is_final,
                speech_final,
                channel,
            } => {
                let text = channel
                    .alternatives
                    .into_iter()
                    .next()
                    .map(|alt| alt.transcript)
                    .unwrap_or_default();
                Some(LiveEvent::Transcript {
                    text,
                    is_final,
                    speech_final,
                })
            }
            StreamMessage::Metadata { request_id } => {
                Some(LiveEvent::Metadata(request_id.unwrap_or_default()))
            }
            StreamMessage::SpeechStarted { .. } => Some(LiveEvent::SpeechStarted),
            StreamMessage::UtteranceEnd { .. } => Some(LiveEvent::UtteranceEnd),
            StreamMessage::Error {
                description,
                message,
            } => Some(LiveEvent::Error(
                description
                    .or(message)
                    .unwrap_or_else(|| "unknown stream error".to_string()),
            )),
            StreamMessage::Unknown => None,
        }
    }
}
