use anyhow::Result;
use console::style;

use crate::cli::OutputFormat;
use crate::resolver::TranscriptResult;
use crate::server::TranscriptResponse;

/// Render a transcript in the requested format
pub fn render(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(result.transcript.clone()),
        OutputFormat::Json => {
            let response = TranscriptResponse::from(result.clone());
            Ok(serde_json::to_string_pretty(&response)?)
        }
    }
}

/// Print transcription result to console
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;

    if matches!(format, OutputFormat::Text) {
        eprintln!(
            "{} {} via {} ({} chars)",
            style("✓").green().bold(),
            style(&result.video_id).bold(),
            style(result.method).cyan(),
            result.length()
        );
    }

    println!("{}", content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::TranscriptMethod;

    fn result() -> TranscriptResult {
        TranscriptResult {
            video_id: "abc123".to_string(),
            transcript: "hello world".to_string(),
            method: TranscriptMethod::PrimaryCaptions,
        }
    }

    #[test]
    fn text_is_the_bare_transcript() {
        assert_eq!(render(&result(), &OutputFormat::Text).unwrap(), "hello world");
    }

    #[test]
    fn json_matches_http_envelope() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&result(), &OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["video_id"], "abc123");
        assert_eq!(json["transcript"], "hello world");
        assert_eq!(json["method"], "primary-captions");
        assert_eq!(json["length"], 11);
    }
}
