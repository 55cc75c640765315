use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::TranscriptorError;

/// AWS Transcribe transcript format
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: String,
}

/// Polls a transcription job until it finishes or `max_wait` elapses
pub struct TranscriptionProcessor {
    client: TranscribeClient,
    http: reqwest::Client,
    job_id: String,
    max_wait: Duration,
}

impl TranscriptionProcessor {
    pub fn new(client: TranscribeClient, http: reqwest::Client, job_id: String, max_wait: Duration) -> Self {
        Self {
            client,
            http,
            job_id,
            max_wait,
        }
    }

    /// Wait for transcription job completion
    pub async fn wait_for_completion(&self) -> Result<String> {
        let start_time = Instant::now();
        let mut check_count: u64 = 0;

        let job = loop {
            check_count += 1;

            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) | Some(TranscriptionJobStatus::Queued) => {
                    if start_time.elapsed() >= self.max_wait {
                        return Err(TranscriptorError::Timeout {
                            operation: "AWS transcription job",
                            seconds: self.max_wait.as_secs(),
                        }
                        .into());
                    }

                    tracing::debug!(
                        "Transcribing {} ({}s elapsed, check #{})",
                        self.job_id,
                        start_time.elapsed().as_secs(),
                        check_count
                    );

                    sleep(Duration::from_secs(poll_delay(check_count))).await;
                }
                Some(TranscriptionJobStatus::Completed) => break job,
                Some(TranscriptionJobStatus::Failed) => {
                    let failure_reason = job.failure_reason().unwrap_or("Unknown error");
                    return Err(TranscriptorError::TranscriptionFailed(failure_reason.to_string()).into());
                }
                _ => anyhow::bail!("Unexpected transcription job status"),
            }
        };

        self.process_transcription_result(job, start_time.elapsed()).await
    }

    /// Get transcription job details
    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_id)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
    }

    /// Process completed transcription result
    async fn process_transcription_result(
        &self,
        job: TranscriptionJob,
        processing_duration: Duration,
    ) -> Result<String> {
        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;

        let transcript_json = self.download_transcript(transcript_uri).await?;
        let transcript = parse_transcript(&transcript_json)?;

        tracing::info!(
            "Transcription job {} finished in {} (language: {})",
            self.job_id,
            crate::utils::format_duration(processing_duration.as_secs_f64()),
            job.language_code().map(|lc| lc.as_str()).unwrap_or("unknown")
        );

        Ok(transcript)
    }

    /// Download transcript JSON from the pre-signed URI
    async fn download_transcript(&self, uri: &str) -> Result<String> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .context("Failed to download transcript")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download transcript: HTTP {}", response.status());
        }

        response
            .text()
            .await
            .context("Failed to read transcript content")
    }
}

/// Seconds to wait before the next status check (grows to 30s)
fn poll_delay(check_count: u64) -> u64 {
    std::cmp::min(5 + check_count.saturating_sub(1) * 2, 30)
}

fn parse_transcript(json: &str) -> Result<String> {
    let aws_transcript: AwsTranscript =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;

    Ok(aws_transcript
        .results
        .transcripts
        .into_iter()
        .map(|t| t.transcript)
        .collect::<Vec<_>>()
        .join(" "))
}
