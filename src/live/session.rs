//! Live session driver: a single-owner loop that folds recognition
//! events into finalized utterances.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::LiveEvent;
use super::stream::{DeepgramLiveClient, StreamHandles};
use crate::transcript::TranscriptCollector;

/// Bounded wait for socket tasks after the event loop ends, before the
/// tasks are aborted outright.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Consume recognition events until the stream closes or `cancel` fires.
///
/// Only settled (`is_final`) results are accumulated; interim results are
/// progressive rewrites of the same slot. When a result arrives with
/// `speech_final`, the collector is finalized (its state resets before
/// the utterance is handed to `on_utterance`) and the non-empty
/// utterance is emitted exactly once. Event errors are logged without
/// touching accumulated state; cancellation discards any partial
/// accumulation.
pub async fn drive_events<F>(
    mut events: mpsc::Receiver<LiveEvent>,
    cancel: CancellationToken,
    mut on_utterance: F,
) -> Vec<String>
where
    F: FnMut(&str),
{
    let mut collector = TranscriptCollector::new();
    let mut utterances = Vec::new();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Live session cancelled, discarding partial utterance");
                collector.reset();
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            LiveEvent::Transcript {
                text,
                is_final,
                speech_final,
            } => {
                if text.trim().is_empty() {
                    continue;
                }
                if is_final {
                    collector.add_fragment(&text);
                }
                if speech_final {
                    let utterance = collector.finalize();
                    if utterance.is_empty() {
                        debug!("Speech-final with no accumulated text");
                        continue;
                    }
                    utterances.push(utterance.clone());
                    on_utterance(&utterance);
                }
            }
            LiveEvent::SpeechStarted => debug!("Speech started"),
            LiveEvent::UtteranceEnd => debug!("Utterance end marker"),
            LiveEvent::Metadata(request_id) => {
                debug!("Stream metadata received (request {})", request_id)
            }
            LiveEvent::Error(message) => {
                // Keep accumulated fragments; only a close ends the session.
                warn!("Live stream error: {}", message);
            }
            LiveEvent::Closed => {
                info!("Live stream closed");
                break;
            }
        }
    }

    utterances
}

/// One live transcription session: connects the streaming client, drives
/// the aggregation loop, and tears the socket tasks down with a bounded
/// wait.
pub struct LiveSession {
    client: DeepgramLiveClient,
    cancel: CancellationToken,
}

impl LiveSession {
    pub fn new(client: DeepgramLiveClient, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Run until the stream closes or the session is cancelled. Returns
    /// all finalized utterances in order.
    pub async fn run<F>(self, audio_rx: mpsc::Receiver<Vec<u8>>, on_utterance: F) -> Result<Vec<String>>
    where
        F: FnMut(&str),
    {
        let (events, handles) = self.client.connect(audio_rx, self.cancel.clone()).await?;

        let utterances = drive_events(events, self.cancel.clone(), on_utterance).await;

        // The loop is done; make sure the socket tasks wind down too.
        self.cancel.cancel();
        shutdown(handles).await;

        Ok(utterances)
    }
}

async fn shutdown(handles: StreamHandles) {
    let StreamHandles { sender, reader } = handles;

    for (name, mut handle) in [("sender", sender), ("reader", reader)] {
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(_) => debug!("Stream {} task finished", name),
            Err(_) => {
                warn!("Stream {} task did not stop within grace period, aborting", name);
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(text: &str, is_final: bool, speech_final: bool) -> LiveEvent {
        LiveEvent::Transcript {
            text: text.to_string(),
            is_final,
            speech_final,
        }
    }

    async fn drive(events: Vec<LiveEvent>) -> (Vec<String>, Vec<String>) {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let mut emitted = Vec::new();
        let utterances = drive_events(rx, CancellationToken::new(), |u| {
            emitted.push(u.to_string())
        })
        .await;
        (utterances, emitted)
    }

    #[tokio::test]
    async fn test_interim_results_are_not_double_counted() {
        let (utterances, emitted) = drive(vec![
            transcript("Hel", false, false),
            transcript("Hello", true, false),
            transcript(" world", true, true),
        ])
        .await;

        assert_eq!(utterances, vec!["Hello world".to_string()]);
        assert_eq!(emitted, vec!["Hello world".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_transcripts_are_ignored() {
        let (utterances, _) = drive(vec![
            transcript("", true, false),
            transcript("   ", true, false),
            transcript("actual words", true, true),
        ])
        .await;

        assert_eq!(utterances, vec!["actual words".to_string()]);
    }

    #[tokio::test]
    async fn test_multiple_utterances_emit_separately() {
        let (utterances, emitted) = drive(vec![
            transcript("first", true, true),
            transcript("second part", true, false),
            transcript("done", true, true),
        ])
        .await;

        assert_eq!(
            utterances,
            vec!["first".to_string(), "second part done".to_string()]
        );
        assert_eq!(emitted.len(), 2);
    }

    #[tokio::test]
    async fn test_error_event_preserves_accumulated_state() {
        let (utterances, _) = drive(vec![
            transcript("before error", true, false),
            LiveEvent::Error("transient".to_string()),
            transcript("after error", true, true),
        ])
        .await;

        assert_eq!(utterances, vec!["before error after error".to_string()]);
    }

    #[tokio::test]
    async fn test_closed_event_ends_the_loop() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(transcript("pending", true, false)).await.unwrap();
        tx.send(LiveEvent::Closed).await.unwrap();
        // Channel stays open; the loop must exit on Closed regardless.

        let utterances = drive_events(rx, CancellationToken::new(), |_| {}).await;
        assert!(utterances.is_empty());
        drop(tx);
    }

    #[tokio::test]
    async fn test_cancellation_discards_partial_text() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(transcript("half an", true, false)).await.unwrap();

        let cancel = CancellationToken::new();
        let driver = tokio::spawn(drive_events(rx, cancel.clone(), |_| {}));

        // Give the loop a chance to consume the pending event, then cancel.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let utterances = driver.await.unwrap();
        assert!(utterances.is_empty());
        drop(tx);
    }

    #[tokio::test]
    async fn test_speech_final_without_text_emits_nothing() {
        let (utterances, emitted) = drive(vec![transcript("   ", true, true)]).await;
        assert!(utterances.is_empty());
        assert!(emitted.is_empty());
    }
}
