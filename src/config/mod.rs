use anyhow::{Context, Result};
use aws_config::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Caption lookup settings
    pub captions: CaptionsConfig,

    /// Speech-to-text fallback settings
    pub speech: SpeechConfig,

    /// AWS configuration (used by the AWS Transcribe recognizer)
    pub aws: AwsConfig,

    /// Timeouts for outbound calls
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port used when neither `--port` nor `PORT` is given
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    /// Languages tried first, in order
    pub preferred_languages: Vec<String>,

    /// Languages preferred when picking an alternate track
    pub fallback_languages: Vec<String>,

    /// Path to the yt-dlp binary
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Enable the speech-to-text fallback
    pub enabled: bool,

    /// Language hint passed to the recognizer (auto-detect if not set)
    pub language: Option<String>,

    /// Upper bound for download + transcription of one video
    pub timeout_secs: u64,

    /// Maximum concurrent recognizer invocations
    pub max_concurrent_jobs: usize,

    /// Temporary directory for downloaded audio
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// S3 bucket for temporary audio storage
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// yt-dlp metadata and caption listing
    pub metadata_secs: u64,

    /// HTTP downloads of caption tracks and transcripts
    pub http_secs: u64,

    /// yt-dlp audio download
    pub download_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            captions: CaptionsConfig {
                preferred_languages: vec!["en".to_string()],
                fallback_languages: vec!["en-US".to_string(), "en-GB".to_string()],
                yt_dlp_path: "yt-dlp".to_string(),
            },
            speech: SpeechConfig {
                enabled: false,
                language: None,
                timeout_secs: 900,
                max_concurrent_jobs: 2,
                temp_dir: None,
            },
            aws: AwsConfig {
                region: "us-east-1".to_string(),
                s3_bucket: "".to_string(),
                s3_key_prefix: Some("yt-transcript-service/".to_string()),
            },
            timeouts: TimeoutConfig {
                metadata_secs: 60,
                http_secs: 30,
                download_secs: 600,
            },
        }
    }
}

impl TimeoutConfig {
    pub fn metadata(&self) -> Duration {
        Duration::from_secs(self.metadata_secs)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript-service").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.captions.preferred_languages.is_empty() {
            anyhow::bail!("At least one preferred caption language must be configured");
        }

        if self.timeouts.metadata_secs == 0
            || self.timeouts.http_secs == 0
            || self.timeouts.download_secs == 0
            || self.speech.timeout_secs == 0
        {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        if self.speech.max_concurrent_jobs == 0 {
            anyhow::bail!("speech.max_concurrent_jobs must be at least 1");
        }

        if self.speech.enabled && self.aws.s3_bucket.is_empty() {
            anyhow::bail!("AWS S3 bucket must be configured when speech-to-text is enabled");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Preferred languages: {}", self.captions.preferred_languages.join(", "));
        println!("  Fallback languages: {}", self.captions.fallback_languages.join(", "));
        println!("  yt-dlp: {}", self.captions.yt_dlp_path);
        println!("  Speech-to-text: {}", if self.speech.enabled { "enabled" } else { "disabled" });
        if self.speech.enabled {
            println!("  AWS Region: {}", self.aws.region);
            println!("  S3 Bucket: {}", self.aws.s3_bucket);
            if let Some(prefix) = &self.aws.s3_key_prefix {
                println!("  S3 Prefix: {}", prefix);
            }
            println!("  Speech timeout: {}s", self.speech.timeout_secs);
        }
        if let Ok(path) = Self::config_path() {
            println!("  Config file: {}", path.display());
        }
    }

    /// Get AWS region
    pub fn aws_region(&self) -> Region {
        Region::new(self.aws.region.clone())
    }
}
