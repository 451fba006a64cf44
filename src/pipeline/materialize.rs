//! Content materialization: turn each extracted URL into a base64 payload.
//!
//! Every URL gets exactly one independent attempt. A failure is logged and
//! recorded in that URL's [`UrlOutcome`]; it never aborts the batch and never
//! affects another URL. Outcomes come back in extraction order even when
//! several URLs are in flight at once.

use crate::config::PipelineConfig;
use crate::output::UrlOutcome;
use crate::pipeline::encode::encode_payload;
use crate::pipeline::fetch::PageFetcher;
use crate::pipeline::render::PdfRenderer;
use futures::stream::{self, StreamExt};
use std::borrow::Cow;
use tracing::{info, warn};

/// Prepend `https://` unless the URL already carries an HTTP(S) scheme.
pub fn normalize_url(url: &str) -> Cow<'_, str> {
    if has_http_scheme(url) {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("https://{url}"))
    }
}

fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// The two ways a URL can be materialized.
#[derive(Clone, Copy)]
pub enum Source<'a> {
    Fetch(&'a dyn PageFetcher),
    Render(&'a dyn PdfRenderer),
}

impl<'a> Source<'a> {
    /// Pick the renderer for PDF jobs, the fetcher otherwise.
    pub fn select(
        render_as_pdf: bool,
        fetcher: &'a dyn PageFetcher,
        renderer: &'a dyn PdfRenderer,
    ) -> Self {
        if render_as_pdf {
            Source::Render(renderer)
        } else {
            Source::Fetch(fetcher)
        }
    }
}

/// Materialize one URL. `index` is 1-based.
pub async fn materialize_one(
    index: usize,
    total: usize,
    url: &str,
    source: Source<'_>,
    config: &PipelineConfig,
) -> UrlOutcome {
    let normalized = normalize_url(url).into_owned();
    info!("Processing URL {}/{}: {}", index, total, normalized);

    if let Some(ref cb) = config.progress_callback {
        cb.on_url_start(index, total, url);
    }

    let bytes = match source {
        Source::Fetch(fetcher) => fetcher.fetch(&normalized).await,
        Source::Render(renderer) => renderer.render_to_pdf(&normalized).await,
    };

    let result = bytes.map(|b| encode_payload(&b));

    match &result {
        Ok(payload) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_url_complete(index, total, url, payload.len());
            }
        }
        Err(e) => {
            warn!("Error processing URL {}: {}", normalized, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_url_error(index, total, url, &e.to_string());
            }
        }
    }

    UrlOutcome {
        index,
        original_url: url.to_string(),
        normalized_url: normalized,
        result,
    }
}

/// Materialize every URL, returning one outcome per URL in input order.
///
/// With `config.concurrency == 1` URLs are processed strictly one after the
/// other. Larger values overlap up to that many attempts; ordering is kept
/// by an order-preserving buffer.
pub async fn materialize(
    urls: &[String],
    render_as_pdf: bool,
    fetcher: &dyn PageFetcher,
    renderer: &dyn PdfRenderer,
    config: &PipelineConfig,
) -> Vec<UrlOutcome> {
    let total = urls.len();
    let source = Source::select(render_as_pdf, fetcher, renderer);

    if config.concurrency <= 1 {
        let mut outcomes = Vec::with_capacity(total);
        for (i, url) in urls.iter().enumerate() {
            outcomes.push(materialize_one(i + 1, total, url, source, config).await);
        }
        return outcomes;
    }

    // Collected eagerly: a lazy map over borrowed URLs makes the job future
    // non-`Send`, so it could not be spawned.
    let attempts: Vec<_> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| materialize_one(i + 1, total, url, source, config))
        .collect();

    stream::iter(attempts)
        .buffered(config.concurrency)
        .collect()
        .await
}
