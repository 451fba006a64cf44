//! Dispatch decision: text-only or text+media.

use crate::output::{DispatchMode, MaterializedContent};

/// Decide the outbound send for a job.
///
/// Media is attached only for PDF jobs with at least one successful render.
/// Raw fetches (`render_as_pdf == false`) are never attached, even when they
/// succeeded.
pub fn decide(materialized: &[MaterializedContent], render_as_pdf: bool) -> DispatchMode {
    if render_as_pdf && !materialized.is_empty() {
        DispatchMode::TextWithMedia {
            media: materialized.iter().map(|m| m.payload.clone()).collect(),
        }
    } else {
        DispatchMode::TextOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(url: &str, payload: &str) -> MaterializedContent {
        MaterializedContent {
            original_url: url.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn pdf_with_successes_attaches_in_order() {
        let m = vec![content("a", "AA=="), content("b", "Qg==")];
        assert_eq!(
            decide(&m, true),
            DispatchMode::TextWithMedia {
                media: vec!["AA==".into(), "Qg==".into()]
            }
        );
    }

    #[test]
    fn pdf_without_successes_is_text_only() {
        assert_eq!(decide(&[], true), DispatchMode::TextOnly);
    }

    #[test]
    fn raw_fetch_never_attaches() {
        let m = vec![content("a", "AA==")];
        assert_eq!(decide(&m, false), DispatchMode::TextOnly);
        assert_eq!(decide(&[], false), DispatchMode::TextOnly);
    }
}
