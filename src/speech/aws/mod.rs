use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use super::{AudioFormat, DeferredCleanup, SpeechRecognizer};
use crate::config::Config;
use crate::utils::normalize_language_code;
use crate::TranscriptorError;

pub mod processor;

/// Speech recognizer backed by AWS Transcribe batch jobs.
///
/// Audio is staged in S3, transcribed, and both the S3 object and the job are
/// removed afterwards whatever the outcome, including cancellation.
pub struct AwsTranscribe {
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    http: reqwest::Client,
    bucket: String,
    key_prefix: String,
    language: Option<String>,
    max_wait: Duration,
}

impl AwsTranscribe {
    /// Create the AWS clients once for the lifetime of the process
    pub async fn from_config(config: &Config) -> Result<Self> {
        if config.aws.s3_bucket.is_empty() {
            return Err(TranscriptorError::AwsConfigError("S3 bucket is not configured".to_string()).into());
        }

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.aws_region())
            .load()
            .await;

        let http = reqwest::Client::builder()
            .timeout(config.timeouts.http())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            s3_client: S3Client::new(&aws_config),
            transcribe_client: TranscribeClient::new(&aws_config),
            http,
            bucket: config.aws.s3_bucket.clone(),
            key_prefix: config.aws.s3_key_prefix.clone().unwrap_or_default(),
            language: config.speech.language.clone(),
            max_wait: config.speech.timeout(),
        })
    }

    /// Upload audio file to S3
    async fn upload_to_s3(&self, audio_path: &Path, format: AudioFormat) -> Result<String> {
        let key = format!(
            "{}audio_{}_{}.{}",
            self.key_prefix,
            Uuid::new_v4(),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            format.as_str()
        );

        tracing::info!("Uploading audio to S3: s3://{}/{}", self.bucket, key);

        let content = fs_err::read(audio_path)?;

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(content.into())
            .content_type(format.mime_type())
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    /// Start AWS Transcribe job with configured or detected language
    async fn start_transcription_job(&self, s3_key: &str, format: AudioFormat) -> Result<String> {
        let job_name = format!("yt_transcript_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.bucket, s3_key);

        tracing::info!("Starting transcription job: {}", job_name);

        let media_format = match format {
            AudioFormat::Mp3 => MediaFormat::Mp3,
            AudioFormat::M4a => MediaFormat::Mp4,
            AudioFormat::Wav => MediaFormat::Wav,
            AudioFormat::Flac => MediaFormat::Flac,
            AudioFormat::Ogg => MediaFormat::Ogg,
            AudioFormat::Webm => MediaFormat::Webm,
        };

        let media = Media::builder().media_file_uri(media_uri).build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(media_format)
            .media(media);

        if let Some(lang) = self.language.as_deref() {
            let lang = normalize_language_code(lang);
            tracing::debug!("Using specified language: {}", lang);
            job_builder = job_builder.language_code(lang.as_str().into());
        } else {
            job_builder = job_builder.identify_language(true);
        }

        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    async fn run_job(&self, s3_key: &str, format: AudioFormat) -> Result<String> {
        let job_name = self.start_transcription_job(s3_key, format).await?;
        let cleanup = DeferredCleanup::new(delete_job(self.transcribe_client.clone(), job_name.clone()));

        let result = processor::TranscriptionProcessor::new(
            self.transcribe_client.clone(),
            self.http.clone(),
            job_name,
            self.max_wait,
        )
        .wait_for_completion()
        .await;

        cleanup.run().await;
        result
    }
}

async fn delete_job(client: TranscribeClient, job_name: String) {
    tracing::debug!("Deleting transcription job: {}", job_name);

    if let Err(e) = client
        .delete_transcription_job()
        .transcription_job_name(&job_name)
        .send()
        .await
    {
        tracing::warn!("Failed to delete transcription job {}: {}", job_name, e);
    }
}

/// Clean up S3 object
async fn delete_s3_object(client: S3Client, bucket: String, key: String) {
    tracing::debug!("Cleaning up S3 object: {}", key);

    if let Err(e) = client.delete_object().bucket(&bucket).key(&key).send().await {
        tracing::warn!("Failed to clean up S3 object {}: {}", key, e);
    }
}

#[async_trait]
impl SpeechRecognizer for AwsTranscribe {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let format = AudioFormat::from_path(audio).ok_or_else(|| {
            TranscriptorError::TranscriptionFailed(format!("unsupported audio file: {}", audio.display()))
        })?;

        let s3_key = self.upload_to_s3(audio, format).await?;
        let cleanup = DeferredCleanup::new(delete_s3_object(
            self.s3_client.clone(),
            self.bucket.clone(),
            s3_key.clone(),
        ));

        let result = self.run_job(&s3_key, format).await;
        cleanup.run().await;
        result
    }

    fn backend_name(&self) -> &'static str {
        "AWS Transcribe"
    }
}
