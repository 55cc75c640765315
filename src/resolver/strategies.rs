use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{ResolutionError, ResolveContext, Strategy, StrategyOutcome, TranscriptMethod};
use crate::captions::{join_segments, CaptionError, CaptionProvider, CaptionTrack};
use crate::speech::SpeechToText;

/// Captions in one of the preferred languages
pub struct PrimaryCaptions {
    provider: Arc<dyn CaptionProvider>,
    languages: Vec<String>,
}

impl PrimaryCaptions {
    pub fn new(provider: Arc<dyn CaptionProvider>, languages: Vec<String>) -> Self {
        Self { provider, languages }
    }
}

#[async_trait]
impl Strategy for PrimaryCaptions {
    fn method(&self) -> TranscriptMethod {
        TranscriptMethod::PrimaryCaptions
    }

    async fn attempt(&self, ctx: &mut ResolveContext<'_>) -> Result<StrategyOutcome, ResolutionError> {
        let track = match ctx.tracks(self.provider.as_ref()).await {
            Ok(tracks) => match tracks.find(&self.languages) {
                Ok(track) => track.clone(),
                Err(reason) => return Ok(StrategyOutcome::Unavailable(reason)),
            },
            Err(err) => return classify(err),
        };

        fetch_text(self.provider.as_ref(), &track).await
    }
}

/// Any other caption track, picked by the fallback rule of [`crate::captions::TrackList::pick_fallback`]
pub struct AlternateCaptions {
    provider: Arc<dyn CaptionProvider>,
    fallback_languages: Vec<String>,
}

impl AlternateCaptions {
    pub fn new(provider: Arc<dyn CaptionProvider>, fallback_languages: Vec<String>) -> Self {
        Self {
            provider,
            fallback_languages,
        }
    }
}

#[async_trait]
impl Strategy for AlternateCaptions {
    fn method(&self) -> TranscriptMethod {
        TranscriptMethod::AlternateLanguageCaptions
    }

    async fn attempt(&self, ctx: &mut ResolveContext<'_>) -> Result<StrategyOutcome, ResolutionError> {
        let track = match ctx.tracks(self.provider.as_ref()).await {
            Ok(tracks) => match tracks.pick_fallback(&self.fallback_languages) {
                Ok(track) => track.clone(),
                Err(reason) => return Ok(StrategyOutcome::Unavailable(reason)),
            },
            Err(err) => return classify(err),
        };

        tracing::info!(
            "Using {} captions{}",
            track.language_code,
            if track.is_generated { " (generated)" } else { "" }
        );
        fetch_text(self.provider.as_ref(), &track).await
    }
}

/// Download the audio and run it through the speech recognizer
pub struct SpeechToTextStrategy {
    speech: SpeechToText,
    timeout: Duration,
}

impl SpeechToTextStrategy {
    pub fn new(speech: SpeechToText, timeout: Duration) -> Self {
        Self { speech, timeout }
    }
}

#[async_trait]
impl Strategy for SpeechToTextStrategy {
    fn method(&self) -> TranscriptMethod {
        TranscriptMethod::SpeechToText
    }

    async fn attempt(&self, ctx: &mut ResolveContext<'_>) -> Result<StrategyOutcome, ResolutionError> {
        if let Some(reason) = ctx.known_unavailable() {
            return Ok(StrategyOutcome::Unavailable(reason.clone()));
        }

        let video_id = ctx.video_id();
        let text = tokio::time::timeout(self.timeout, self.speech.transcribe(video_id))
            .await
            .map_err(|_| ResolutionError::Timeout {
                operation: "speech-to-text",
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| ResolutionError::SpeechToText(format!("{:#}", e)))?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(StrategyOutcome::Unavailable(CaptionError::NoTranscriptFound {
                requested: "speech-to-text".to_string(),
                available: "no recognized speech".to_string(),
            }));
        }

        Ok(StrategyOutcome::Resolved(text.to_string()))
    }
}

async fn fetch_text(
    provider: &dyn CaptionProvider,
    track: &CaptionTrack,
) -> Result<StrategyOutcome, ResolutionError> {
    let segments = match provider.fetch_track(track).await {
        Ok(segments) => segments,
        Err(err) => return classify(err),
    };

    let text = join_segments(&segments);
    if text.trim().is_empty() {
        return Ok(StrategyOutcome::Unavailable(CaptionError::NoTranscriptFound {
            requested: track.language_code.clone(),
            available: "empty track".to_string(),
        }));
    }

    Ok(StrategyOutcome::Resolved(text))
}

fn classify(err: CaptionError) -> Result<StrategyOutcome, ResolutionError> {
    if err.is_classified() {
        Ok(StrategyOutcome::Unavailable(err))
    } else {
        Err(err.into())
    }
}
