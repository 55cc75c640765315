use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod json3;
pub mod youtube;

use crate::resolver::VideoId;

/// One timed piece of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Segment text
    pub text: String,
}

/// A caption track offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported by the provider (e.g. `en`, `en-US`)
    pub language_code: String,

    /// Human readable language name, if known
    pub language_name: Option<String>,

    /// Whether the track was generated by automatic speech recognition
    pub is_generated: bool,

    /// Where the track content can be downloaded
    pub url: String,
}

/// All caption tracks of a video, in a deterministic order
#[derive(Debug, Clone, PartialEq)]
pub struct TrackList {
    /// Language the video declares for itself, if any
    pub video_language: Option<String>,

    tracks: Vec<CaptionTrack>,
}

/// Domain errors reported by a caption provider.
///
/// The first three variants are classified: the resolver reacts to them by
/// trying its next strategy. `Provider` and `Timeout` are not.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    #[error("Transcripts are disabled for this video")]
    CaptionsDisabled,

    #[error("No transcript found for this video (requested: {requested}; available: {available})")]
    NoTranscriptFound { requested: String, available: String },

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Caption provider error: {0}")]
    Provider(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

impl CaptionError {
    /// Whether the resolver may recover from this error with another strategy
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            CaptionError::CaptionsDisabled
                | CaptionError::NoTranscriptFound { .. }
                | CaptionError::VideoUnavailable(_)
        )
    }

    /// Category name reported to clients
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::CaptionsDisabled => "CaptionsDisabled",
            CaptionError::NoTranscriptFound { .. } => "NoTranscriptFound",
            CaptionError::VideoUnavailable(_) => "VideoUnavailable",
            CaptionError::Provider(_) => "ProviderError",
            CaptionError::Timeout { .. } => "Timeout",
        }
    }
}

impl TrackList {
    /// Build a list, ordering manual tracks before generated ones and each
    /// group by language code.
    pub fn new(video_language: Option<String>, mut tracks: Vec<CaptionTrack>) -> Self {
        tracks.sort_by(|a, b| {
            a.is_generated
                .cmp(&b.is_generated)
                .then_with(|| a.language_code.cmp(&b.language_code))
        });
        Self {
            video_language,
            tracks,
        }
    }

    pub fn tracks(&self) -> &[CaptionTrack] {
        &self.tracks
    }

    /// Find a track in one of `languages`, checked in order. A manual track
    /// wins over a generated one for the same language.
    pub fn find(&self, languages: &[String]) -> Result<&CaptionTrack, CaptionError> {
        if self.tracks.is_empty() {
            return Err(CaptionError::CaptionsDisabled);
        }

        languages
            .iter()
            .find_map(|lang| self.track_for(lang, false).or_else(|| self.track_for(lang, true)))
            .ok_or_else(|| CaptionError::NoTranscriptFound {
                requested: languages.join(", "),
                available: self.available_languages(),
            })
    }

    /// Pick an alternate track when the preferred languages are missing
    pub fn pick_fallback(&self, fallback_languages: &[String]) -> Result<&CaptionTrack, CaptionError> {
        if self.tracks.is_empty() {
            return Err(CaptionError::CaptionsDisabled);
        }

        let by_language = |generated: bool| {
            fallback_languages
                .iter()
                .find_map(|lang| self.track_for(lang, generated))
        };

        by_language(false)
            .or_else(|| by_language(true))
            .or_else(|| self.tracks.iter().find(|t| !t.is_generated))
            .or_else(|| {
                self.video_language
                    .as_deref()
                    .and_then(|lang| self.track_for(lang, true))
            })
            .or_else(|| self.tracks.first())
            .ok_or(CaptionError::CaptionsDisabled)
    }

    fn track_for(&self, language: &str, generated: bool) -> Option<&CaptionTrack> {
        self.tracks
            .iter()
            .find(|t| t.is_generated == generated && t.language_code == language)
    }

    fn available_languages(&self) -> String {
        self.tracks
            .iter()
            .map(|t| {
                if t.is_generated {
                    format!("{} (generated)", t.language_code)
                } else {
                    t.language_code.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Join segment texts with single spaces, in segment order
pub fn join_segments(segments: &[CaptionSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Source of caption tracks for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// List every caption track the video offers
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackList, CaptionError>;

    /// Download and parse the segments of one track
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>, CaptionError>;

    /// Get the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: lang.to_string(),
            language_name: None,
            is_generated: generated,
            url: format!("https://captions.test/{}/{}", lang, generated),
        }
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn find_prefers_manual_track() {
        let list = TrackList::new(None, vec![track("en", true), track("en", false)]);
        let found = list.find(&langs(&["en"])).unwrap();
        assert!(!found.is_generated);
    }

    #[test]
    fn find_walks_languages_in_order() {
        let list = TrackList::new(None, vec![track("de", false), track("fr", true)]);
        let found = list.find(&langs(&["fr", "de"])).unwrap();
        assert_eq!(found.language_code, "fr");
    }

    #[test]
    fn find_reports_missing_language() {
        let list = TrackList::new(None, vec![track("de", false), track("es", true)]);
        match list.find(&langs(&["en"])) {
            Err(CaptionError::NoTranscriptFound { requested, available }) => {
                assert_eq!(requested, "en");
                assert_eq!(available, "de, es (generated)");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_listing_means_captions_disabled() {
        let list = TrackList::new(Some("en".to_string()), vec![]);
        assert_eq!(list.find(&langs(&["en"])), Err(CaptionError::CaptionsDisabled));
        assert_eq!(list.pick_fallback(&[]), Err(CaptionError::CaptionsDisabled));
    }

    #[test]
    fn fallback_prefers_configured_language() {
        let list = TrackList::new(
            None,
            vec![track("de", false), track("en-GB", true), track("en-US", true)],
        );
        let picked = list.pick_fallback(&langs(&["en-US", "en-GB"])).unwrap();
        assert_eq!(picked.language_code, "en-US");
    }

    #[test]
    fn fallback_takes_manual_before_generated() {
        let list = TrackList::new(None, vec![track("ja", true), track("pt", false)]);
        let picked = list.pick_fallback(&langs(&["en-US"])).unwrap();
        assert_eq!(picked.language_code, "pt");
    }

    #[test]
    fn fallback_uses_video_language_for_generated_tracks() {
        let list = TrackList::new(
            Some("ko".to_string()),
            vec![track("ar", true), track("ko", true), track("zh", true)],
        );
        let picked = list.pick_fallback(&[]).unwrap();
        assert_eq!(picked.language_code, "ko");
    }

    #[test]
    fn fallback_is_deterministic_regardless_of_input_order() {
        let a = TrackList::new(None, vec![track("zh", true), track("ar", true)]);
        let b = TrackList::new(None, vec![track("ar", true), track("zh", true)]);
        assert_eq!(a.pick_fallback(&[]).unwrap(), b.pick_fallback(&[]).unwrap());
        assert_eq!(a.pick_fallback(&[]).unwrap().language_code, "ar");
    }

    #[test]
    fn join_uses_single_spaces_in_order() {
        let segments = vec![
            CaptionSegment { start: 0.0, duration: 1.0, text: "hello".to_string() },
            CaptionSegment { start: 1.0, duration: 1.0, text: "world".to_string() },
        ];
        assert_eq!(join_segments(&segments), "hello world");
        assert_eq!(join_segments(&[]), "");
    }

    #[test]
    fn provider_errors_are_not_classified() {
        assert!(CaptionError::CaptionsDisabled.is_classified());
        assert!(CaptionError::VideoUnavailable("x".into()).is_classified());
        assert!(!CaptionError::Provider("boom".into()).is_classified());
        assert_eq!(CaptionError::Provider("boom".into()).kind(), "ProviderError");
    }
}
