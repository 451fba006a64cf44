//! Progress-callback trait for per-URL pipeline events.
//!
//! Inject an [`Arc<dyn DispatchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline materializes each URL and dispatches the message.
//!
//! Callers can forward events to a channel, a metrics sink or a terminal
//! progress bar without the library knowing how the host reports progress.
//! The trait is `Send + Sync` because URLs may be materialized concurrently
//! when `concurrency > 1`.
//!
//! # Example
//!
//! ```rust
//! use msgtrigger::{DispatchProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl DispatchProgressCallback for FailureCounter {
//!     fn on_url_error(&self, _index: usize, _total: usize, url: &str, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{url}: {error}");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(FailureCounter { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes a job.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. URL indices are 1-based.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_url_start`, `on_url_complete` and
/// `on_url_error` may be called concurrently. Protect shared mutable state
/// with `Mutex` or atomics.
pub trait DispatchProgressCallback: Send + Sync {
    /// Called once, after extraction, before any URL is materialized.
    fn on_job_start(&self, url_count: usize) {
        let _ = url_count;
    }

    /// Called just before a URL is fetched or rendered.
    fn on_url_start(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when a URL was materialized.
    ///
    /// `payload_len` is the length of the base64 payload.
    fn on_url_complete(&self, index: usize, total: usize, url: &str, payload_len: usize) {
        let _ = (index, total, url, payload_len);
    }

    /// Called when a URL failed and was dropped from the media list.
    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        let _ = (index, total, url, error);
    }

    /// Called right before the single outbound send.
    ///
    /// `mode` is `"text"` or `"text+media"`.
    fn on_dispatch(&self, mode: &str, media_count: usize) {
        let _ = (mode, media_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DispatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn DispatchProgressCallback>;
