//! Output types: per-URL outcomes, the dispatch decision and the run summary.

use crate::error::UrlError;
use serde::{Deserialize, Serialize};

/// A URL that was fetched or rendered successfully.
///
/// Serialises with the field names downstream consumers already read
/// (`originalUrl`, `base64Data`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedContent {
    /// The URL exactly as it appeared in the message (before normalisation).
    #[serde(rename = "originalUrl")]
    pub original_url: String,
    /// Standard-alphabet base64 of the fetched bytes or rendered PDF.
    #[serde(rename = "base64Data")]
    pub payload: String,
}

/// The result of materializing one extracted URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOutcome {
    /// 1-based position in extraction order.
    pub index: usize,
    pub original_url: String,
    /// The URL actually requested (`https://` prepended when needed).
    pub normalized_url: String,
    /// Base64 payload on success.
    pub result: Result<String, UrlError>,
}

impl UrlOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&UrlError> {
        self.result.as_ref().err()
    }
}

/// Keep only the successful outcomes, in extraction order.
pub fn successes(outcomes: &[UrlOutcome]) -> Vec<MaterializedContent> {
    outcomes
        .iter()
        .filter_map(|o| match &o.result {
            Ok(payload) => Some(MaterializedContent {
                original_url: o.original_url.clone(),
                payload: payload.clone(),
            }),
            Err(_) => None,
        })
        .collect()
}

/// Which outbound send the job ends with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchMode {
    /// Plain text message.
    TextOnly,
    /// Text with base64 attachments, in extraction order.
    TextWithMedia { media: Vec<String> },
}

impl DispatchMode {
    /// Short label used in logs and progress events.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchMode::TextOnly => "text",
            DispatchMode::TextWithMedia { .. } => "text+media",
        }
    }

    pub fn media_count(&self) -> usize {
        match self {
            DispatchMode::TextOnly => 0,
            DispatchMode::TextWithMedia { media } => media.len(),
        }
    }
}

/// Statistics for a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub urls_found: usize,
    pub urls_materialized: usize,
    pub urls_failed: usize,
    pub materialize_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Summary returned by [`crate::trigger::MessageTrigger::run`]. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    #[serde(rename = "numero")]
    pub recipient: String,
    /// Every extracted URL, in order, duplicates included.
    pub urls: Vec<String>,
    /// Successfully materialized URLs. `media.len() <= urls.len()`.
    #[serde(rename = "base64Urls")]
    pub media: Vec<MaterializedContent>,
    pub mode: DispatchMode,
    /// Per-URL failures, kept for reporting only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UrlOutcome>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, url: &str, result: Result<&str, UrlError>) -> UrlOutcome {
        UrlOutcome {
            index,
            original_url: url.to_string(),
            normalized_url: format!("https://{url}"),
            result: result.map(str::to_string),
        }
    }

    #[test]
    fn successes_keep_order_and_drop_failures() {
        let outcomes = vec![
            outcome(1, "a.com", Ok("QQ==")),
            outcome(
                2,
                "b.com",
                Err(UrlError::HttpStatus {
                    url: "https://b.com".into(),
                    status: 500,
                }),
            ),
            outcome(3, "c.com", Ok("Qw==")),
        ];
        let ok = successes(&outcomes);
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].original_url, "a.com");
        assert_eq!(ok[1].original_url, "c.com");
        assert!(outcomes[1].error().is_some());
    }

    #[test]
    fn materialized_content_uses_wire_names() {
        let m = MaterializedContent {
            original_url: "www.site.com".into(),
            payload: "JVBERg==".into(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["originalUrl"], "www.site.com");
        assert_eq!(json["base64Data"], "JVBERg==");
    }

    #[test]
    fn mode_labels() {
        assert_eq!(DispatchMode::TextOnly.label(), "text");
        let m = DispatchMode::TextWithMedia {
            media: vec!["a".into(), "b".into()],
        };
        assert_eq!(m.label(), "text+media");
        assert_eq!(m.media_count(), 2);
    }

    #[test]
    fn dispatch_result_serialises_recipient_as_numero() {
        let r = DispatchResult {
            recipient: "5511".into(),
            urls: vec![],
            media: vec![],
            mode: DispatchMode::TextOnly,
            failures: vec![],
            stats: RunStats::default(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["numero"], "5511");
        assert_eq!(json["mode"]["kind"], "text_only");
        assert!(json.get("failures").is_none());
    }
}
