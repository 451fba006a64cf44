//! Configuration types for the send-message pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. One struct holds every knob so a config can
//! be shared by concurrent workers, logged, and diffed between runs.

use crate::error::TriggerError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Configuration for the send-message pipeline.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use msgtrigger::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_base_url("https://chat.internal:8443")
///     .navigation_timeout_secs(45)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum number of URLs materialized at once. Default: 1 (sequential).
    ///
    /// Results always come back in extraction order regardless of this value;
    /// raising it only overlaps the network waits of independent URLs.
    pub concurrency: usize,

    /// Timeout for raw content fetches, in seconds. Default: `None`.
    ///
    /// `None` leaves only the HTTP client's own defaults in force, so a hostile
    /// endpoint can hold a fetch open indefinitely.
    pub fetch_timeout_secs: Option<u64>,

    /// Upper bound on page navigation (including the network-idle wait) when
    /// rendering to PDF. Default: 30.
    pub navigation_timeout_secs: u64,

    /// Network is considered idle with at most this many requests in flight.
    /// Default: 2.
    pub idle_max_inflight: usize,

    /// How long the in-flight count must stay under
    /// [`idle_max_inflight`](Self::idle_max_inflight) before printing. Default: 500.
    pub idle_settle_ms: u64,

    /// Margin applied to all four PDF page edges, in CSS pixels. Default: 20.
    pub pdf_margin_px: u32,

    /// Print background colours and images. Default: true.
    pub print_background: bool,

    /// Explicit Chrome/Chromium executable. If None, chromiumoxide searches
    /// the usual install locations.
    pub chrome_path: Option<String>,

    /// Run the browser without a window. Default: true.
    pub headless: bool,

    /// User agent for both the HTTP fetcher and the browser.
    pub user_agent: Option<String>,

    /// Base URL of the chat-delivery API. Default: `http://localhost:3000`.
    pub api_base_url: String,

    /// Path (relative to `api_base_url`) of the text-only send. Default: `send-message`.
    pub text_path: String,

    /// Path (relative to `api_base_url`) of the text+media send. Default: `send-message-media`.
    pub media_path: String,

    /// HTTP timeout for the outbound send, in seconds. Default: 60.
    pub delivery_timeout_secs: u64,

    /// Optional per-URL progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fetch_timeout_secs: None,
            navigation_timeout_secs: 30,
            idle_max_inflight: 2,
            idle_settle_ms: 500,
            pdf_margin_px: 20,
            print_background: true,
            chrome_path: None,
            headless: true,
            user_agent: None,
            api_base_url: "http://localhost:3000".to_string(),
            text_path: "send-message".to_string(),
            media_path: "send-message-media".to_string(),
            delivery_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("idle_max_inflight", &self.idle_max_inflight)
            .field("idle_settle_ms", &self.idle_settle_ms)
            .field("pdf_margin_px", &self.pdf_margin_px)
            .field("print_background", &self.print_background)
            .field("chrome_path", &self.chrome_path)
            .field("headless", &self.headless)
            .field("user_agent", &self.user_agent)
            .field("api_base_url", &self.api_base_url)
            .field("text_path", &self.text_path)
            .field("media_path", &self.media_path)
            .field("delivery_timeout_secs", &self.delivery_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DispatchProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn idle_settle(&self) -> Duration {
        Duration::from_millis(self.idle_settle_ms)
    }

    /// PDF margin in inches, the unit the DevTools print API expects.
    pub fn pdf_margin_inches(&self) -> f64 {
        px_to_inches(self.pdf_margin_px)
    }

    /// Full URL of a delivery endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// CSS pixels are defined at 96 per inch.
pub fn px_to_inches(px: u32) -> f64 {
    f64::from(px) / 96.0
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs;
        self
    }

    pub fn idle_max_inflight(mut self, n: usize) -> Self {
        self.config.idle_max_inflight = n;
        self
    }

    pub fn idle_settle_ms(mut self, ms: u64) -> Self {
        self.config.idle_settle_ms = ms;
        self
    }

    pub fn pdf_margin_px(mut self, px: u32) -> Self {
        self.config.pdf_margin_px = px;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print_background = v;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn headless(mut self, v: bool) -> Self {
        self.config.headless = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn text_path(mut self, path: impl Into<String>) -> Self {
        self.config.text_path = path.into();
        self
    }

    pub fn media_path(mut self, path: impl Into<String>) -> Self {
        self.config.media_path = path.into();
        self
    }

    pub fn delivery_timeout_secs(mut self, secs: u64) -> Self {
        self.config.delivery_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, TriggerError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(TriggerError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.navigation_timeout_secs == 0 {
            return Err(TriggerError::InvalidConfig(
                "Navigation timeout must be ≥ 1s".into(),
            ));
        }
        if c.api_base_url.trim().is_empty() {
            return Err(TriggerError::InvalidConfig(
                "Delivery API base URL must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_render_contract() {
        let c = PipelineConfig::default();
        assert_eq!(c.navigation_timeout_secs, 30);
        assert_eq!(c.idle_max_inflight, 2);
        assert_eq!(c.pdf_margin_px, 20);
        assert!(c.print_background);
        assert_eq!(c.concurrency, 1);
        assert!(c.fetch_timeout_secs.is_none());
    }

    #[test]
    fn margin_in_inches() {
        let c = PipelineConfig::default();
        assert!((c.pdf_margin_inches() - 20.0 / 96.0).abs() < f64::EPSILON);
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let err = PipelineConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, TriggerError::InvalidConfig(_)), "got: {err:?}");
    }

    #[test]
    fn debug_lists_every_plain_field() {
        let c = PipelineConfig::builder()
            .user_agent("ua-test")
            .text_path("t-path")
            .media_path("m-path")
            .delivery_timeout_secs(7)
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        for needle in [
            "user_agent: Some(\"ua-test\")",
            "text_path: \"t-path\"",
            "media_path: \"m-path\"",
            "delivery_timeout_secs: 7",
        ] {
            assert!(dbg.contains(needle), "missing {needle} in {dbg}");
        }
    }

    #[test]
    fn builder_rejects_zero_navigation_timeout() {
        let err = PipelineConfig::builder()
            .navigation_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, TriggerError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_api_url() {
        let err = PipelineConfig::builder().api_base_url("  ").build().unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let c = PipelineConfig::builder()
            .api_base_url("http://chat.local/api/")
            .build()
            .unwrap();
        assert_eq!(c.endpoint("/send-message"), "http://chat.local/api/send-message");
        assert_eq!(c.endpoint(&c.media_path), "http://chat.local/api/send-message-media");
    }
}
