//! Speech-to-text fallback: fetch a video's audio into a scoped temporary
//! directory and hand it to a recognizer.

use anyhow::Context;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub mod aws;
pub mod youtube;

use crate::resolver::VideoId;
use crate::Result;

/// Audio formats the recognizers accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "opus" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// Fetches the audio track of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Download the audio of `video_id` into `dir` and return the file path
    async fn download(&self, video_id: &VideoId, dir: &Path) -> Result<PathBuf>;
}

/// Turns an audio file into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;

    fn backend_name(&self) -> &'static str;
}

/// Temporary directory holding downloaded audio. Removed on `release` or
/// when dropped, whichever comes first.
pub struct ScopedAudio {
    dir: TempDir,
}

impl ScopedAudio {
    pub fn new(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("yt-audio-");

        let dir = match root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("Failed to create temporary audio directory")?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory now, logging instead of failing
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!("Removed temporary audio: {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove temporary audio {}: {}", path.display(), e),
        }
    }
}

/// Cleanup work that must happen even if the owning future is cancelled.
///
/// Call [`DeferredCleanup::run`] on the normal path. If the guard is dropped
/// first (timeout, client disconnect), the work is spawned onto the runtime.
pub struct DeferredCleanup {
    task: Option<Pin<Box<dyn Future<Output = ()> + Send + 'static>>>,
}

impl DeferredCleanup {
    pub fn new(task: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            task: Some(Box::pin(task)),
        }
    }

    pub async fn run(mut self) {
        if let Some(task) = self.task.take() {
            task.await;
        }
    }
}

impl Drop for DeferredCleanup {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Operation cancelled, running cleanup in background");
                handle.spawn(task);
            }
            Err(_) => tracing::warn!("Operation cancelled outside a runtime, cleanup skipped"),
        }
    }
}

/// Admits a bounded number of concurrent recognizer calls
#[derive(Clone)]
pub struct GuardedRecognizer {
    inner: Arc<dyn SpeechRecognizer>,
    permits: Arc<Semaphore>,
}

impl GuardedRecognizer {
    pub fn new(inner: Arc<dyn SpeechRecognizer>, max_concurrent_jobs: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GuardedRecognizer {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .context("Recognizer guard closed")?;
        self.inner.transcribe(audio).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

/// Audio source and recognizer, shared across requests
#[derive(Clone)]
pub struct SpeechToText {
    audio: Arc<dyn AudioSource>,
    recognizer: GuardedRecognizer,
    temp_root: Option<PathBuf>,
}

impl SpeechToText {
    pub fn new(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        max_concurrent_jobs: usize,
        temp_root: Option<PathBuf>,
    ) -> Self {
        Self {
            audio,
            recognizer: GuardedRecognizer::new(recognizer, max_concurrent_jobs),
            temp_root,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.recognizer.backend_name()
    }

    /// Download and transcribe one video. The temporary audio is removed
    /// before returning, and also if this future is dropped early.
    pub async fn transcribe(&self, video_id: &VideoId) -> Result<String> {
        let scoped = ScopedAudio::new(self.temp_root.as_deref())?;

        let outcome = async {
            tracing::info!("Downloading audio for {}", video_id);
            let audio_path = self.audio.download(video_id, scoped.path()).await?;
            tracing::info!("Transcribing {}", audio_path.display());
            self.recognizer.transcribe(&audio_path).await
        }
        .await;

        scoped.release();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn audio_format_from_path() {
        assert_eq!(AudioFormat::from_path(Path::new("/tmp/a/audio.mp3")), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_path(Path::new("audio.OPUS")), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::from_path(Path::new("audio")), None);
        assert_eq!(AudioFormat::M4a.mime_type(), "audio/mp4");
    }

    #[test]
    fn scoped_audio_is_removed_on_release_and_drop() {
        let root = tempfile::tempdir().unwrap();

        let scoped = ScopedAudio::new(Some(root.path())).unwrap();
        let released = scoped.path().to_path_buf();
        fs_err::write(released.join("audio.mp3"), b"data").unwrap();
        scoped.release();
        assert!(!released.exists());

        let scoped = ScopedAudio::new(Some(root.path())).unwrap();
        let dropped = scoped.path().to_path_buf();
        drop(scoped);
        assert!(!dropped.exists());
    }

    #[tokio::test]
    async fn temp_audio_is_removed_when_recognition_fails() {
        let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let seen_in_mock = seen.clone();

        let mut audio = MockAudioSource::new();
        audio.expect_download().returning(move |_, dir| {
            let file = dir.join("audio.mp3");
            fs_err::write(&file, b"not really mp3")?;
            *seen_in_mock.lock().unwrap() = Some(dir.to_path_buf());
            Ok(file)
        });
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .returning(|_| Err(anyhow::anyhow!("inference failed")));

        let root = tempfile::tempdir().unwrap();
        let speech = SpeechToText::new(
            Arc::new(audio),
            Arc::new(recognizer),
            1,
            Some(root.path().to_path_buf()),
        );

        let id = VideoId::parse("abc123").unwrap();
        assert!(speech.transcribe(&id).await.is_err());

        let dir = seen.lock().unwrap().clone().unwrap();
        assert!(!dir.exists());
    }

    /// Recognizer shaped like the AWS one: stage remote state, guard its
    /// removal, then wait on a long job.
    struct StagedRecognizer {
        removed: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl SpeechRecognizer for StagedRecognizer {
        async fn transcribe(&self, _audio: &Path) -> Result<String> {
            let tx = self.removed.lock().unwrap().take();
            let cleanup = DeferredCleanup::new(async move {
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
            });

            tokio::time::sleep(Duration::from_secs(3600)).await;
            cleanup.run().await;
            Ok("done".to_string())
        }

        fn backend_name(&self) -> &'static str {
            "staged"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_runs_when_recognition_is_cancelled() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let recognizer = StagedRecognizer {
            removed: Mutex::new(Some(tx)),
        };

        let outcome =
            tokio::time::timeout(Duration::from_secs(5), recognizer.transcribe(Path::new("audio.mp3"))).await;
        assert!(outcome.is_err());

        let removed = tokio::time::timeout(Duration::from_secs(1), rx).await;
        assert!(matches!(removed, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn cleanup_runs_inline_on_success() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let cleanup = DeferredCleanup::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cleanup.run().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    struct CountingRecognizer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SpeechRecognizer for CountingRecognizer {
        async fn transcribe(&self, _audio: &Path) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("ok".to_string())
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn guard_serializes_when_limited_to_one() {
        let inner = Arc::new(CountingRecognizer {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let guarded = GuardedRecognizer::new(inner.clone(), 1);

        let path = Path::new("audio.mp3");
        let (a, b, c) = tokio::join!(
            guarded.transcribe(path),
            guarded.transcribe(path),
            guarded.transcribe(path)
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(inner.peak.load(Ordering::SeqCst), 1);
    }
}
