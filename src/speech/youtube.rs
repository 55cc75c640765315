use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AudioFormat, AudioSource};
use crate::resolver::VideoId;
use crate::{Result, TranscriptorError};

/// YouTube audio downloader using yt-dlp
pub struct YoutubeAudio {
    yt_dlp_path: String,
    timeout: Duration,
}

impl YoutubeAudio {
    pub fn new(yt_dlp_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            timeout,
        }
    }

    /// Locate the file yt-dlp produced after post-processing
    fn find_output(dir: &Path) -> Result<PathBuf> {
        let mut candidates: Vec<PathBuf> = fs_err::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && AudioFormat::from_path(path).is_some())
            .collect();
        candidates.sort();

        candidates.into_iter().next().ok_or_else(|| {
            TranscriptorError::AudioExtractionFailed(format!(
                "yt-dlp finished but no audio file was written to {}",
                dir.display()
            ))
            .into()
        })
    }
}

#[async_trait]
impl AudioSource for YoutubeAudio {
    async fn download(&self, video_id: &VideoId, dir: &Path) -> Result<PathBuf> {
        let url = video_id.watch_url();
        let template = dir.join("audio.%(ext)s").to_string_lossy().into_owned();
        tracing::debug!("Downloading audio for {} into {}", url, dir.display());

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args([
                "--output",
                template.as_str(),
                // Extract audio in the most efficient format for transcription
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "9",
                // Prioritize smaller/faster formats
                "--format",
                "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio",
                "--no-playlist",
                "--concurrent-fragments",
                "4",
                "--no-progress",
                "--no-warnings",
                url.as_str(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| TranscriptorError::Timeout {
                operation: "audio download",
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| TranscriptorError::ToolUnavailable(format!("{}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptorError::AudioExtractionFailed(error.trim().to_string()).into());
        }

        Self::find_output(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_converted_audio() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("audio.info.json"), b"{}").unwrap();
        fs_err::write(dir.path().join("audio.mp3"), b"id3").unwrap();

        let found = YoutubeAudio::find_output(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "audio.mp3");
    }

    #[test]
    fn empty_directory_is_an_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = YoutubeAudio::find_output(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no audio file"));
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let source = YoutubeAudio::new("definitely-not-yt-dlp-binary", Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let id = VideoId::parse("abc123").unwrap();

        let err = source.download(&id, dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("External tool not available"));
    }
}
