//! Command wiring: config → service clients → pipeline.
//!
//! Clients are constructed once per run and injected explicitly; nothing
//! here holds global state.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::audio::{MicSource, TARGET_SAMPLE_RATE};
use crate::cli::{LiveCliArgs, UploadCliArgs};
use crate::config::Config;
use crate::error::MeetscribeError;
use crate::live::{DeepgramLiveClient, LiveSession, LiveStreamOptions};
use crate::meeting::{save_live_transcript, MeetingPipeline};
use crate::minutes::{MinutesGenerator, OpenAiClient};
use crate::stt::DeepgramBatchClient;

pub async fn run_upload(args: UploadCliArgs) -> Result<()> {
    let config = Config::load()?;

    // Credentials are checked before any network or file activity.
    let deepgram_key = config.deepgram_api_key()?.to_string();
    let openai_key = config.openai_api_key()?.to_string();

    let stt = DeepgramBatchClient::new(
        deepgram_key,
        config.deepgram.api_endpoint.clone(),
        config.deepgram.model.clone(),
        Duration::from_secs(config.deepgram.request_timeout_seconds),
    )?;

    let openai = OpenAiClient::new(
        openai_key,
        config.openai.api_endpoint.clone(),
        config.openai.model.clone(),
        Duration::from_secs(config.openai.request_timeout_seconds),
    )?;
    let generator = MinutesGenerator::new(openai, config.openai.max_attempts);

    let output_dir = resolve_output_dir(&config, args.output_dir)?;
    let pipeline = MeetingPipeline::new(
        Box::new(stt),
        Box::new(generator),
        config.deepgram.language.clone(),
        output_dir,
        config.output.keep_normalized_audio,
    );

    match pipeline.run_upload(&args.file, args.language).await {
        Ok(outcome) => {
            if args.show_transcript {
                println!("Transcript ({}):\n", args.language);
                println!("{}\n", outcome.transcript);
            }
            println!("Minutes of Meeting:\n");
            println!("{}\n", outcome.minutes);
            println!("Transcript saved to: {}", outcome.transcript_path.display());
            println!("Minutes saved to:    {}", outcome.minutes_path.display());
            Ok(())
        }
        Err(err) if is_empty_result(&err) => {
            println!("No speech detected in the recording; nothing was generated.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

pub async fn run_live(args: LiveCliArgs) -> Result<()> {
    let config = Config::load()?;
    let deepgram_key = config.deepgram_api_key()?.to_string();
    let output_dir = resolve_output_dir(&config, args.output_dir)?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c_watcher(cancel.clone());

    let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(64);
    let mut mic = MicSource::new(TARGET_SAMPLE_RATE)?;
    mic.start(frame_tx)?;

    let options = LiveStreamOptions {
        model: config.deepgram.model.clone(),
        language: config.deepgram.language.clone(),
        sample_rate: TARGET_SAMPLE_RATE,
        ..LiveStreamOptions::default()
    };
    let client = DeepgramLiveClient::new(deepgram_key, config.deepgram.live_endpoint.clone(), options);
    let session = LiveSession::new(client, cancel.clone());

    println!("Listening... press Ctrl-C to stop.");
    let utterances = session
        .run(frame_rx, |utterance| println!("{}", utterance))
        .await?;

    mic.stop();

    match save_live_transcript(&output_dir, &utterances)? {
        Some(path) => println!("\nTranscript saved to: {}", path.display()),
        None => println!("\nNo speech was finalized; no transcript saved."),
    }

    Ok(())
}

fn resolve_output_dir(config: &Config, override_dir: Option<PathBuf>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => config.output_dir(),
    }
}

fn spawn_ctrl_c_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping live session");
            cancel.cancel();
        }
    });
}

fn is_empty_result(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<MeetscribeError>(),
        Some(MeetscribeError::EmptyResult(_))
    )
}
