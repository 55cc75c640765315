use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

use super::{json3, CaptionError, CaptionProvider, CaptionSegment, CaptionTrack, TrackList};
use crate::resolver::VideoId;

/// Messages yt-dlp prints when the video itself cannot be reached
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "This video is not available",
    "members-only",
    "Sign in to confirm your age",
    "Incomplete YouTube ID",
    "is not a valid URL",
];

/// Subtitle keys that are not caption tracks
const IGNORED_TRACKS: &[&str] = &["live_chat", "rechat"];

/// Subset of `yt-dlp --dump-json` needed to enumerate captions
#[derive(Debug, Deserialize)]
struct VideoInfo {
    language: Option<String>,
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<SubtitleFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<SubtitleFormat>>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFormat {
    ext: Option<String>,
    url: String,
    name: Option<String>,
}

/// YouTube caption provider using yt-dlp for discovery and the timedtext
/// endpoint for content
pub struct YoutubeCaptions {
    yt_dlp_path: String,
    http: reqwest::Client,
    metadata_timeout: Duration,
    http_timeout: Duration,
}

impl YoutubeCaptions {
    pub fn new(
        yt_dlp_path: impl Into<String>,
        metadata_timeout: Duration,
        http_timeout: Duration,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .user_agent(concat!("yt-transcript-service/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            yt_dlp_path: yt_dlp_path.into(),
            http,
            metadata_timeout,
            http_timeout,
        })
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video_id: &VideoId) -> Result<VideoInfo, CaptionError> {
        let url = video_id.watch_url();
        tracing::debug!("Listing caption tracks for: {}", url);

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", url.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.metadata_timeout, command.output())
            .await
            .map_err(|_| CaptionError::Timeout {
                operation: "yt-dlp caption listing",
                seconds: self.metadata_timeout.as_secs(),
            })?
            .map_err(|e| CaptionError::Provider(format!("failed to run {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(video_id, &stderr));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CaptionError::Provider(format!("unexpected yt-dlp output: {}", e)))
    }

    fn request_error(&self, e: reqwest::Error) -> CaptionError {
        if e.is_timeout() {
            CaptionError::Timeout {
                operation: "caption download",
                seconds: self.http_timeout.as_secs(),
            }
        } else {
            CaptionError::Provider(format!("caption download failed: {}", e))
        }
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackList, CaptionError> {
        let info = self.get_video_info(video_id).await?;
        let list = track_list_from_info(info);
        tracing::debug!("Found {} caption tracks for {}", list.tracks().len(), video_id);
        Ok(list)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>, CaptionError> {
        let url = json3_url(&track.url)?;
        tracing::debug!("Downloading {} captions", track.language_code);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(CaptionError::Provider(format!(
                "caption download failed: HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        json3::parse(&body)
    }

    fn provider_name(&self) -> &'static str {
        "YouTube (yt-dlp)"
    }
}

fn track_list_from_info(info: VideoInfo) -> TrackList {
    let manual = info.subtitles.into_iter().map(|entry| (entry, false));
    let generated = info.automatic_captions.into_iter().map(|entry| (entry, true));

    let tracks = manual
        .chain(generated)
        .filter(|((lang, _), _)| !IGNORED_TRACKS.contains(&lang.as_str()))
        .filter_map(|((lang, formats), is_generated)| {
            let format = formats
                .iter()
                .find(|f| f.ext.as_deref() == Some("json3"))
                .or_else(|| formats.first())?;
            Some(CaptionTrack {
                language_code: lang,
                language_name: format.name.clone(),
                is_generated,
                url: format.url.clone(),
            })
        })
        .collect();

    TrackList::new(info.language, tracks)
}

/// Force the timedtext URL to return json3
fn json3_url(raw: &str) -> Result<Url, CaptionError> {
    let mut url = Url::parse(raw)
        .map_err(|e| CaptionError::Provider(format!("invalid caption URL {}: {}", raw, e)))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url)
}

fn classify_failure(video_id: &VideoId, stderr: &str) -> CaptionError {
    if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
        CaptionError::VideoUnavailable(video_id.to_string())
    } else {
        CaptionError::Provider(format!("yt-dlp failed: {}", stderr.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tracks_from_dump_json() {
        let info: VideoInfo = serde_json::from_str(
            r#"{
                "id": "abc123",
                "language": "en",
                "subtitles": {
                    "live_chat": [{"ext": "json", "url": "https://www.youtube.com/live_chat"}],
                    "de": [
                        {"ext": "vtt", "url": "https://www.youtube.com/api/timedtext?v=abc123&lang=de&fmt=vtt", "name": "German"},
                        {"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=abc123&lang=de&fmt=json3", "name": "German"}
                    ]
                },
                "automatic_captions": {
                    "en": [{"ext": "srv1", "url": "https://www.youtube.com/api/timedtext?v=abc123&lang=en&kind=asr&fmt=srv1"}]
                }
            }"#,
        )
        .unwrap();

        let list = track_list_from_info(info);
        let tracks = list.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "de");
        assert!(!tracks[0].is_generated);
        assert!(tracks[0].url.ends_with("fmt=json3"));
        assert_eq!(tracks[0].language_name.as_deref(), Some("German"));
        assert_eq!(tracks[1].language_code, "en");
        assert!(tracks[1].is_generated);
        assert_eq!(list.video_language.as_deref(), Some("en"));
    }

    #[test]
    fn missing_caption_maps_mean_no_tracks() {
        let info: VideoInfo = serde_json::from_str(r#"{"id": "abc123"}"#).unwrap();
        assert!(track_list_from_info(info).tracks().is_empty());
    }

    #[test]
    fn json3_url_replaces_format() {
        let url = json3_url("https://www.youtube.com/api/timedtext?v=abc&lang=en&fmt=srv1").unwrap();
        let fmt: Vec<_> = url.query_pairs().filter(|(k, _)| k == "fmt").collect();
        assert_eq!(fmt.len(), 1);
        assert_eq!(fmt[0].1, "json3");
        assert!(url.as_str().contains("lang=en"));
    }

    #[test]
    fn classifies_unavailable_videos() {
        let id = VideoId::parse("abc123").unwrap();
        let err = classify_failure(&id, "ERROR: [youtube] abc123: Video unavailable");
        assert_eq!(err, CaptionError::VideoUnavailable("abc123".to_string()));

        let err = classify_failure(&id, "ERROR: unable to download webpage: HTTP Error 503");
        assert!(matches!(err, CaptionError::Provider(_)));
    }
}
