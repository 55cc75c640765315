//! Parser for YouTube's `json3` timed-text format.
//!
//! A document is a list of events; each event with `segs` is one caption cue
//! whose text is the concatenation of its segments. Events without text
//! (window definitions, bare line breaks) are skipped.

use serde::Deserialize;

use super::{CaptionError, CaptionSegment};

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 document into caption segments
pub fn parse(body: &str) -> Result<Vec<CaptionSegment>, CaptionError> {
    let document: Json3Document = serde_json::from_str(body)
        .map_err(|e| CaptionError::Provider(format!("malformed json3 captions: {}", e)))?;

    let segments = document
        .events
        .into_iter()
        .filter_map(|event| {
            let raw: String = event.segs?.into_iter().map(|s| s.utf8).collect();
            let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(CaptionSegment {
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
                text,
            })
        })
        .collect();

    Ok(segments)
}
