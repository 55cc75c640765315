use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;

#[derive(Parser)]
#[command(
    name = "yt-transcript-service",
    about = "YouTube Transcript Service - resolve video transcripts from captions or speech-to-text",
    version,
    long_about = "An HTTP service that returns the transcript of a YouTube video. Captions in the preferred language are tried first, then any other caption track, and optionally the audio is downloaded and transcribed with AWS Transcribe."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Interface to listen on
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Enable the speech-to-text fallback
        #[arg(long)]
        speech_to_text: bool,
    },

    /// Resolve one transcript and print it
    Fetch {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO_ID_OR_URL")]
        video: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Preferred caption language (repeatable, replaces the configured list)
        #[arg(short, long, value_name = "LANG")]
        language: Vec<String>,

        /// Enable the speech-to-text fallback
        #[arg(long)]
        speech_to_text: bool,
    },

    /// Show the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that external tools are installed
    Check,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON, same shape as the HTTP response
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
