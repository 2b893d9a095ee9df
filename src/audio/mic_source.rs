//! Microphone capture via cpal for the live transcription session.
//!
//! Frames are converted to little-endian linear16 in the device callback
//! and pushed onto a channel; the WebSocket sender task drains it. The
//! callback must never block, so a full channel drops the frame.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct MicSource {
    device: cpal::Device,
    config: cpal::StreamConfig,
    stream: Option<cpal::Stream>,
    active: bool,
}

impl MicSource {
    /// Create a mic source on the default input device, capturing mono at
    /// the given sample rate.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available for live capture")?;

        info!(
            "Live capture using device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            config,
            stream: None,
            active: false,
        })
    }

    /// Start capturing, sending each frame as linear16 bytes.
    pub fn start(&mut self, frames: mpsc::Sender<Vec<u8>>) -> Result<()> {
        if self.active {
            return Err(anyhow::anyhow!("Mic source already capturing"));
        }

        let err_fn = |err| error!("Live mic stream error: {}", err);

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let bytes = linear16_bytes(data);
                if let Err(mpsc::error::TrySendError::Full(_)) = frames.try_send(bytes) {
                    warn!("Audio frame dropped: stream sender is falling behind");
                }
            },
            err_fn,
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);
        self.active = true;

        info!("Live mic capture started");
        Ok(())
    }

    /// Stop capturing. The frame channel closes once the stream is
    /// dropped, which signals end-of-audio downstream.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Stopping live mic stream");
            drop(stream);
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        if self.active {
            debug!("Dropping active MicSource, cleaning up");
            self.stop();
        }
    }
}

/// Convert f32 samples in [-1, 1] to little-endian i16 bytes.
fn linear16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
