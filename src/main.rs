use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_transcript_service::captions::youtube::YoutubeCaptions;
use yt_transcript_service::cli::{Cli, Commands};
use yt_transcript_service::config::Config;
use yt_transcript_service::server::{self, AppState};
use yt_transcript_service::speech::aws::AwsTranscribe;
use yt_transcript_service::speech::youtube::YoutubeAudio;
use yt_transcript_service::speech::SpeechToText;
use yt_transcript_service::CaptionProvider;
use yt_transcript_service::{output, utils, TranscriptResolver, VideoId};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve {
            host,
            port,
            speech_to_text,
        } => {
            let mut config = Config::load().await?;
            if speech_to_text {
                config.speech.enabled = true;
                config.validate()?;
            }

            warn_missing_dependencies(&config).await;

            let host = match host {
                Some(host) => host,
                None => config
                    .server
                    .host
                    .parse::<IpAddr>()
                    .context("Invalid server.host in config")?,
            };
            let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));

            let resolver = build_resolver(&config).await?;
            tracing::info!(
                "Resolution order: {}",
                resolver
                    .methods()
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );

            server::serve(
                addr,
                AppState {
                    resolver: Arc::new(resolver),
                },
            )
            .await?;
        }
        Commands::Fetch {
            video,
            format,
            language,
            speech_to_text,
        } => {
            let video_id = VideoId::parse(&video).context("Video id must not be empty")?;

            let mut config = Config::load().await?;
            if !language.is_empty() {
                config.captions.preferred_languages = language;
            }
            if speech_to_text {
                config.speech.enabled = true;
            }
            config.validate()?;

            let resolver = build_resolver(&config).await?;

            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            progress.set_message(format!("Resolving transcript for {}...", video_id));
            progress.enable_steady_tick(Duration::from_millis(120));

            let result = resolver.resolve(&video_id).await;
            progress.finish_and_clear();

            output::print_to_console(&result?, &format)?;
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if !show {
                println!("Edit the config file to change settings.");
            }
            config.display();
        }
        Commands::Check => {
            let config = Config::load().await?;
            let missing =
                utils::check_dependencies(&config.captions.yt_dlp_path, config.speech.enabled).await;
            if missing.is_empty() {
                println!("All external tools are available.");
            } else {
                println!("Missing tools:");
                for dep in missing {
                    println!("   • {}", dep);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "yt_transcript_service=debug,tower_http=debug"
    } else {
        "yt_transcript_service=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Check for required external dependencies (non-fatal)
async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(&config.captions.yt_dlp_path, config.speech.enabled).await;
    for dep in missing {
        tracing::warn!("Dependency check: {} (continuing anyway)", dep);
    }
}

/// Build the caption provider and, when enabled, the speech-to-text backend.
/// Both live for the whole process.
async fn build_resolver(config: &Config) -> Result<TranscriptResolver> {
    let captions = YoutubeCaptions::new(
        config.captions.yt_dlp_path.clone(),
        config.timeouts.metadata(),
        config.timeouts.http(),
    )?;
    tracing::info!("Caption provider: {}", captions.provider_name());

    let speech = if config.speech.enabled {
        let recognizer = AwsTranscribe::from_config(config).await?;
        let audio = YoutubeAudio::new(config.captions.yt_dlp_path.clone(), config.timeouts.download());
        let speech = SpeechToText::new(
            Arc::new(audio),
            Arc::new(recognizer),
            config.speech.max_concurrent_jobs,
            config.speech.temp_dir.clone(),
        );
        tracing::info!("Speech-to-text fallback enabled ({})", speech.backend_name());
        Some(speech)
    } else {
        None
    };

    Ok(TranscriptResolver::from_config(config, Arc::new(captions), speech))
}
