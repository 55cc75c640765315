//! YouTube Transcript Service - resolve a video's transcript over HTTP
//!
//! The service looks for caption tracks first (preferred language, then an
//! alternate language) and can fall back to downloading the audio and running
//! it through a speech recognizer.

pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod resolver;
pub mod server;
pub mod speech;
pub mod utils;

pub use captions::{CaptionError, CaptionProvider, CaptionSegment, CaptionTrack, TrackList};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use resolver::{ResolutionError, TranscriptMethod, TranscriptResolver, TranscriptResult, VideoId};
pub use speech::{AudioSource, SpeechRecognizer};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the service plumbing
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("External tool not available: {0}")]
    ToolUnavailable(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("AWS configuration error: {0}")]
    AwsConfigError(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}
