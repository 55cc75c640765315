//! Transcript resolution.
//!
//! A [`TranscriptResolver`] holds an ordered list of [`Strategy`] values and
//! tries them one after another for a video, stopping at the first that
//! produces text. Strategies report recoverable misses as
//! [`StrategyOutcome::Unavailable`]; anything else aborts the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod strategies;

use crate::captions::{CaptionError, CaptionProvider, TrackList};
use crate::config::Config;
use crate::speech::SpeechToText;
use strategies::{AlternateCaptions, PrimaryCaptions, SpeechToTextStrategy};

/// Validated video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accepts a bare id or a YouTube URL. Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let id = crate::utils::extract_video_id(trimmed).unwrap_or_else(|| trimmed.to_string());
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch page URL handed to yt-dlp
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", urlencoding::encode(&self.0))
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a transcript was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptMethod {
    PrimaryCaptions,
    AlternateLanguageCaptions,
    SpeechToText,
}

impl TranscriptMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptMethod::PrimaryCaptions => "primary-captions",
            TranscriptMethod::AlternateLanguageCaptions => "alternate-language-captions",
            TranscriptMethod::SpeechToText => "speech-to-text",
        }
    }
}

impl fmt::Display for TranscriptMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub video_id: String,
    pub transcript: String,
    pub method: TranscriptMethod,
}

impl TranscriptResult {
    /// Transcript length in characters
    pub fn length(&self) -> usize {
        self.transcript.chars().count()
    }
}

/// Why a video could not be resolved
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("No transcript found for this video")]
    NoTranscript { reason: CaptionError },

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("{0}")]
    Provider(String),

    #[error("Speech-to-text failed: {0}")]
    SpeechToText(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

impl ResolutionError {
    /// Classified failures are the caller's concern (no transcript exists),
    /// the rest are service faults.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            ResolutionError::NoTranscript { .. } | ResolutionError::VideoUnavailable(_)
        )
    }

    /// Category name reported to clients
    pub fn error_type(&self) -> &'static str {
        match self {
            ResolutionError::NoTranscript { reason } => reason.kind(),
            ResolutionError::VideoUnavailable(_) => "VideoUnavailable",
            ResolutionError::Provider(_) => "ProviderError",
            ResolutionError::SpeechToText(_) => "SpeechToTextError",
            ResolutionError::Timeout { .. } => "Timeout",
        }
    }
}

impl From<CaptionError> for ResolutionError {
    fn from(err: CaptionError) -> Self {
        match err {
            CaptionError::VideoUnavailable(id) => ResolutionError::VideoUnavailable(id),
            CaptionError::Provider(msg) => ResolutionError::Provider(msg),
            CaptionError::Timeout { operation, seconds } => ResolutionError::Timeout { operation, seconds },
            reason => ResolutionError::NoTranscript { reason },
        }
    }
}

/// Result of one strategy attempt
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Resolved(String),
    Unavailable(CaptionError),
}

/// Per-request state shared by the strategies of one resolution
pub struct ResolveContext<'a> {
    video_id: &'a VideoId,
    listing: Option<Result<TrackList, CaptionError>>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(video_id: &'a VideoId) -> Self {
        Self {
            video_id,
            listing: None,
        }
    }

    pub fn video_id(&self) -> &VideoId {
        self.video_id
    }

    /// Caption tracks of the video. The provider is asked at most once per
    /// request; later calls see the first answer, errors included.
    pub async fn tracks(&mut self, provider: &dyn CaptionProvider) -> Result<&TrackList, CaptionError> {
        let listing = match self.listing.take() {
            Some(listing) => listing,
            None => provider.list_tracks(self.video_id).await,
        };
        self.listing.insert(listing).as_ref().map_err(|e| e.clone())
    }

    /// The video was reported unreachable by an earlier strategy
    pub fn known_unavailable(&self) -> Option<&CaptionError> {
        match &self.listing {
            Some(Err(err @ CaptionError::VideoUnavailable(_))) => Some(err),
            _ => None,
        }
    }
}

/// One way of obtaining a transcript
#[async_trait]
pub trait Strategy: Send + Sync {
    fn method(&self) -> TranscriptMethod;

    async fn attempt(&self, ctx: &mut ResolveContext<'_>) -> Result<StrategyOutcome, ResolutionError>;
}

/// Ordered fallback chain over transcript strategies
pub struct TranscriptResolver {
    strategies: Vec<Box<dyn Strategy>>,
}

impl TranscriptResolver {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Build the standard chain: preferred captions, alternate captions and,
    /// when a backend is given, speech-to-text.
    pub fn from_config(
        config: &Config,
        captions: Arc<dyn CaptionProvider>,
        speech: Option<SpeechToText>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(PrimaryCaptions::new(
                captions.clone(),
                config.captions.preferred_languages.clone(),
            )),
            Box::new(AlternateCaptions::new(
                captions,
                config.captions.fallback_languages.clone(),
            )),
        ];

        if let Some(speech) = speech {
            strategies.push(Box::new(SpeechToTextStrategy::new(speech, config.speech.timeout())));
        }

        Self::new(strategies)
    }

    /// Strategies in the order they are tried
    pub fn methods(&self) -> Vec<TranscriptMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Resolve the transcript of a video
    pub async fn resolve(&self, video_id: &VideoId) -> Result<TranscriptResult, ResolutionError> {
        let mut ctx = ResolveContext::new(video_id);
        let mut last_reason: Option<CaptionError> = None;

        for strategy in &self.strategies {
            let method = strategy.method();
            tracing::debug!("Trying {} for {}", method, video_id);

            match strategy.attempt(&mut ctx).await {
                Ok(StrategyOutcome::Resolved(transcript)) => {
                    tracing::info!(
                        video_id = %video_id,
                        method = %method,
                        chars = transcript.chars().count(),
                        "Transcript resolved"
                    );
                    return Ok(TranscriptResult {
                        video_id: video_id.to_string(),
                        transcript,
                        method,
                    });
                }
                Ok(StrategyOutcome::Unavailable(reason)) => {
                    tracing::warn!(video_id = %video_id, method = %method, "{}", reason);
                    last_reason = Some(reason);
                }
                Err(err) => {
                    tracing::error!(video_id = %video_id, method = %method, "{}", err);
                    return Err(err);
                }
            }
        }

        Err(last_reason
            .map(ResolutionError::from)
            .unwrap_or(ResolutionError::NoTranscript {
                reason: CaptionError::CaptionsDisabled,
            }))
    }
}
