//! Live transcription WebSocket client.
//!
//! Two tasks own the socket halves: the sender forwards linear16 audio
//! frames and periodic KeepAlive control messages, the reader decodes
//! tagged JSON into [`LiveEvent`]s on an mpsc channel. The aggregator
//! loop consumes that channel and never touches the socket.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{LiveEvent, StreamMessage};

const KEEPALIVE_MESSAGE: &str = r#"{"type": "KeepAlive"}"#;
const CLOSE_STREAM_MESSAGE: &str = r#"{"type": "CloseStream"}"#;
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(8);

/// Streaming recognition options, mirrored into the connection URL.
#[derive(Debug, Clone)]
pub struct LiveStreamOptions {
    pub model: String,
    pub language: String,
    pub sample_rate: u32,
    pub endpointing_ms: u32,
    pub utterance_end_ms: u32,
}

impl Default for LiveStreamOptions {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            sample_rate: 16_000,
            endpointing_ms: 300,
            utterance_end_ms: 1000,
        }
    }
}

pub struct DeepgramLiveClient {
    api_key: String,
    base_url: String,
    options: LiveStreamOptions,
}

/// Socket task handles, joined with a bounded wait at session teardown.
pub struct StreamHandles {
    pub sender: JoinHandle<()>,
    pub reader: JoinHandle<()>,
}

impl DeepgramLiveClient {
    pub fn new(api_key: String, endpoint: Option<String>, options: LiveStreamOptions) -> Self {
        let base_url = endpoint.unwrap_or_else(|| "wss://api.deepgram.com/v1".to_string());
        Self {
            api_key,
            base_url,
            options,
        }
    }

    fn build_ws_url(&self) -> Result<url::Url> {
        let mut url: url::Url = format!("{}/listen", self.base_url)
            .parse()
            .context("Invalid live endpoint URL")?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("model", &self.options.model);
            query.append_pair("language", &self.options.language);
            query.append_pair("encoding", "linear16");
            query.append_pair("channels", "1");
            query.append_pair("sample_rate", &self.options.sample_rate.to_string());
            query.append_pair("punctuate", "true");
            query.append_pair("smart_format", "true");
            query.append_pair("interim_results", "true");
            query.append_pair("endpointing", &self.options.endpointing_ms.to_string());
            query.append_pair("utterance_end_ms", &self.options.utterance_end_ms.to_string());
            query.append_pair("vad_events", "true");
        }

        Ok(url)
    }

    /// Connect and spawn the socket tasks.
    ///
    /// `audio_rx` feeds raw linear16 frames from the capture side. Closing
    /// it, or cancelling `cancel`, sends a CloseStream message so the
    /// service flushes its final results before the socket closes.
    pub async fn connect(
        &self,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        cancel: CancellationToken,
    ) -> Result<(mpsc::Receiver<LiveEvent>, StreamHandles)> {
        let url = self.build_ws_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .context("Failed to build WebSocket request")?;
        request.headers_mut().insert(
            "Authorization",
            format!("Token {}", self.api_key)
                .parse()
                .context("API key is not a valid header value")?,
        );

        info!("Connecting to live transcription stream");
        let (ws_stream, _) = connect_async(request)
            .await
            .context("Failed to connect to live transcription stream")?;
        info!("Live transcription stream connected");

        let (mut sink, mut stream) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::channel::<LiveEvent>(64);

        let sender_cancel = cancel.clone();
        let sender = tokio::spawn(async move {
            let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
            keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = sender_cancel.cancelled() => {
                        debug!("Audio sender cancelled, closing stream");
                        break;
                    }
                    frame = audio_rx.recv() => {
                        match frame {
                            Some(bytes) => {
                                if let Err(e) = sink.send(Message::Binary(bytes)).await {
                                    warn!("Failed to send audio frame: {}", e);
                                    break;
                                }
                            }
                            None => {
                                debug!("Audio source finished, closing stream");
                                break;
                            }
                        }
                    }
                    _ = keepalive.tick() => {
                        if let Err(e) = sink.send(Message::Text(KEEPALIVE_MESSAGE.to_string())).await {
                            warn!("Failed to send keepalive: {}", e);
                            break;
                        }
                    }
                }
            }

            // Ask the service to flush pending results before closing.
            if let Err(e) = sink
                .send(Message::Text(CLOSE_STREAM_MESSAGE.to_string()))
                .await
            {
                debug!("Failed to send close message: {}", e);
            }
            let _ = sink.close().await;
        });

        let reader_cancel = cancel;
        let reader = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    message = stream.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<StreamMessage>(&text) {
                                    Ok(parsed) => {
                                        if let Some(event) = parsed.into_event() {
                                            if event_tx.send(event).await.is_err() {
                                                break;
                                            }
                                        }
                                    }
                                    Err(e) => warn!("Undecodable stream message: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Live stream closed by service: {:?}", frame);
                                let _ = event_tx.send(LiveEvent::Closed).await;
                                break;
                            }
                            Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                            Some(Err(e)) => {
                                error!("Live stream error: {}", e);
                                let _ = event_tx.send(LiveEvent::Error(e.to_string())).await;
                                let _ = event_tx.send(LiveEvent::Closed).await;
                                break;
                            }
                            None => {
                                let _ = event_tx.send(LiveEvent::Closed).await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok((event_rx, StreamHandles { sender, reader }))
    }
}
