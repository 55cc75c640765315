use url::Url;

/// Hosts that serve YouTube videos
fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com"
        || host == "youtu.be"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com")
}

/// Extract the video id from a YouTube URL.
///
/// Returns `None` when `input` is not a URL or not a YouTube video URL, in
/// which case callers treat the input as a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    if host.eq_ignore_ascii_case("youtu.be") {
        return url.path_segments()?.next().and_then(non_empty);
    }

    if url.path().starts_with("/watch") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .and_then(|(_, v)| non_empty(&*v));
    }

    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("shorts" | "embed" | "live" | "v"), Some(id)) => non_empty(id),
        _ => None,
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Parse language code and return the regional code AWS Transcribe expects
pub fn normalize_language_code(lang: &str) -> String {
    let normalized = match lang.to_lowercase().as_str() {
        "en" | "english" => "en-US",
        "es" | "spanish" => "es-ES",
        "fr" | "french" => "fr-FR",
        "de" | "german" => "de-DE",
        "it" | "italian" => "it-IT",
        "pt" | "portuguese" => "pt-BR",
        "ja" | "japanese" => "ja-JP",
        "ko" | "korean" => "ko-KR",
        "zh" | "chinese" => "zh-CN",
        "ar" | "arabic" => "ar-SA",
        "hi" | "hindi" => "hi-IN",
        "ru" | "russian" => "ru-RU",
        _ => lang,
    };

    normalized.to_string()
}

/// Check if the current environment has required tools. ffmpeg only matters
/// for the speech-to-text fallback.
pub async fn check_dependencies(yt_dlp_path: &str, speech_enabled: bool) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required for caption lookup and audio download", yt_dlp_path));
    }

    // yt-dlp needs ffmpeg to convert audio for speech-to-text
    if speech_enabled && !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for speech-to-text audio extraction".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
