use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::minutes::MinutesLanguage;

#[derive(Parser, Debug)]
#[command(name = "meetscribe")]
#[command(about = "Meeting transcription and minutes generator", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Transcribe a recorded meeting and generate minutes
    Upload(UploadCliArgs),
    /// Transcribe the microphone live and save the transcript
    Live(LiveCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct UploadCliArgs {
    /// Path to the meeting recording (WAV is normalized before upload;
    /// other formats are sent as-is)
    pub file: PathBuf,

    /// Language the minutes are generated in
    #[arg(short, long, value_enum, default_value = "english")]
    pub language: MinutesLanguage,

    /// Override the output directory for transcript and minutes files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Print the transcript alongside the minutes
    #[arg(long)]
    pub show_transcript: bool,
}

#[derive(ClapArgs, Debug)]
pub struct LiveCliArgs {
    /// Override the output directory for the transcript file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
