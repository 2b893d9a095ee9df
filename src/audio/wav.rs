//! WAV normalization for the upload path.
//!
//! The transcription service performs best on mono 16 kHz input, so WAV
//! uploads are downmixed and resampled into a temp file first. Other
//! containers are sent as-is; transcoding them is the service's job.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::TARGET_SAMPLE_RATE;

/// Resample audio using linear interpolation. Suitable for speech audio
/// where perfect quality isn't critical.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            let a = samples[src_idx] as f64;
            let b = samples[src_idx + 1] as f64;
            (a + (b - a) * frac) as f32
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0.0
        };
        resampled.push(sample);
    }

    resampled
}

/// Average interleaved channels down to mono.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Normalize a WAV file to mono 16 kHz linear16 in a temp file.
///
/// Returns `None` when the input isn't a WAV (the caller uploads the
/// original bytes instead). The returned temp file is deleted on drop.
pub fn normalize_wav(path: &Path) -> Result<Option<NamedTempFile>> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    if !is_wav {
        debug!("Not a WAV file, uploading as-is: {:?}", path);
        return Ok(None);
    }

    let reader = WavReader::open(path).context("Failed to open WAV file")?;
    let spec = reader.spec();

    debug!(
        "Normalizing WAV: {} ch, {} Hz, {} bit {:?}",
        spec.channels, spec.sample_rate, spec.bits_per_sample, spec.sample_format
    );

    let samples = read_samples(reader)?;
    let mono = downmix_to_mono(&samples, spec.channels);
    let resampled = resample(&mono, spec.sample_rate, TARGET_SAMPLE_RATE);

    let temp = tempfile::Builder::new()
        .prefix("meetscribe-")
        .suffix(".wav")
        .tempfile()
        .context("Failed to create temp WAV file")?;

    write_mono_wav(temp.path(), &resampled)?;

    info!(
        "Normalized {:?}: {} frames at {} Hz",
        path,
        resampled.len(),
        TARGET_SAMPLE_RATE
    );

    Ok(Some(temp))
}

fn read_samples(mut reader: WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to read float WAV samples")?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to read integer WAV samples")?
        }
    };
    Ok(samples)
}

fn write_mono_wav(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).context("Failed to create WAV writer")?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_halves_frame_count() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let out = resample(&samples, 32_000, 16_000);
        let expected = samples.len() / 2;
        assert!((out.len() as i64 - expected as i64).abs() <= 1);
    }

    #[test]
    fn test_resample_upsamples() {
        let samples = vec![0.0, 1.0];
        let out = resample(&samples, 8_000, 16_000);
        assert_eq!(out.len(), 4);
        // Interpolated midpoint between the two input samples.
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_is_identity() {
        let mono = vec![0.25, -0.25];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_normalize_passes_through_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.mp3");
        std::fs::write(&path, b"not really audio").unwrap();
        assert!(normalize_wav(&path).unwrap().is_none());
    }

    #[test]
    fn test_normalize_stereo_wav_to_mono_16k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 32_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..3200 {
            let value = ((i % 100) as f32 / 100.0 * 10_000.0) as i16;
            writer.write_sample(value).unwrap();
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let temp = normalize_wav(&path).unwrap().expect("wav should normalize");
        let reader = WavReader::open(temp.path()).unwrap();
        let out_spec = reader.spec();
        assert_eq!(out_spec.channels, 1);
        assert_eq!(out_spec.sample_rate, TARGET_SAMPLE_RATE);
        // 3200 stereo frames at 32 kHz become ~1600 mono frames at 16 kHz.
        let count = reader.len();
        assert!((count as i64 - 1600).abs() <= 1, "got {} frames", count);
    }
}
