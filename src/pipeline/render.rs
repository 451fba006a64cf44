//! PDF snapshots: print a web page to an A4 PDF with headless Chromium.
//!
//! ## Session lifetime
//!
//! Every call launches its own browser in a throwaway profile directory and
//! closes it before returning, whether printing succeeded or not. Sessions
//! are never pooled or shared between URLs or jobs. [`BrowserSession`] owns
//! the process; its async `close` is the normal exit path and its `Drop`
//! kills the process if the render future is cancelled or unwinds.
//!
//! ## Network idle
//!
//! `Page::goto` resolves on the `load` event, which fires before late XHR
//! and lazy assets. After load we keep counting in-flight requests and only
//! print once no more than `idle_max_inflight` have been pending for
//! `idle_settle_ms`. Navigation plus the idle wait share one
//! `navigation_timeout_secs` bound.

use crate::config::PipelineConfig;
use crate::error::UrlError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Page};
use futures::StreamExt;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// A4 in inches, as the DevTools print API expects.
pub const A4_WIDTH_IN: f64 = 8.27;
pub const A4_HEIGHT_IN: f64 = 11.7;

/// Renders the page behind a URL to PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Navigate to `url` (already normalised) and print it.
    async fn render_to_pdf(&self, url: &str) -> Result<Vec<u8>, UrlError>;
}

/// Render settings, taken from [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub navigation_timeout: Duration,
    pub idle_max_inflight: usize,
    pub idle_settle: Duration,
    pub margin_in: f64,
    pub print_background: bool,
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub user_agent: Option<String>,
}

impl From<&PipelineConfig> for RenderOptions {
    fn from(c: &PipelineConfig) -> Self {
        Self {
            navigation_timeout: c.navigation_timeout(),
            idle_max_inflight: c.idle_max_inflight,
            idle_settle: c.idle_settle(),
            margin_in: c.pdf_margin_inches(),
            print_background: c.print_background,
            chrome_path: c.chrome_path.clone(),
            headless: c.headless,
            user_agent: c.user_agent.clone(),
        }
    }
}

impl RenderOptions {
    /// DevTools print parameters: A4, equal margins on all sides.
    pub fn print_params(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            print_background: Some(self.print_background),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(self.margin_in),
            margin_bottom: Some(self.margin_in),
            margin_left: Some(self.margin_in),
            margin_right: Some(self.margin_in),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

/// Called with every freshly launched [`BrowserSession`].
pub type LaunchHook = Arc<dyn Fn(&BrowserSession) + Send + Sync>;

/// [`PdfRenderer`] that launches a fresh Chromium per call.
#[derive(Clone)]
pub struct ChromiumRenderer {
    options: RenderOptions,
    on_launch: Option<LaunchHook>,
}

impl fmt::Debug for ChromiumRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumRenderer")
            .field("options", &self.options)
            .field("on_launch", &self.on_launch.as_ref().map(|_| "<dyn Fn>"))
            .finish()
    }
}

impl ChromiumRenderer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            options: RenderOptions::from(config),
            on_launch: None,
        }
    }

    /// Observe each browser right after launch (pid, profile directory).
    pub fn on_launch(mut self, hook: impl Fn(&BrowserSession) + Send + Sync + 'static) -> Self {
        self.on_launch = Some(Arc::new(hook));
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    async fn print_in_session(
        &self,
        session: &BrowserSession,
        url: &str,
    ) -> Result<Vec<u8>, UrlError> {
        let page = session.new_page().await?;

        info!("Navigating to: {}", url);
        let secs = self.options.navigation_timeout.as_secs();
        tokio::time::timeout(
            self.options.navigation_timeout,
            navigate_until_idle(&page, url, &self.options),
        )
        .await
        .map_err(|_| UrlError::Timeout {
            url: url.to_string(),
            secs,
        })??;

        info!("Generating PDF: {}", url);
        let pdf = page
            .pdf(self.options.print_params())
            .await
            .map_err(|e| UrlError::PdfPrint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Printed {} bytes of PDF for {}", pdf.len(), url);
        Ok(pdf)
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render_to_pdf(&self, url: &str) -> Result<Vec<u8>, UrlError> {
        info!("Launching browser for: {}", url);
        let session = BrowserSession::launch(&self.options).await?;
        if let Some(ref hook) = self.on_launch {
            hook(&session);
        }
        let result = self.print_in_session(&session, url).await;
        session.close().await;
        if result.is_ok() {
            info!("PDF generated: {}", url);
        }
        result
    }
}

/// A running Chromium process plus its CDP event loop.
///
/// Call [`close`](Self::close) on every path. If the session is dropped
/// without it (cancellation, panic), `Drop` kills the process instead. The
/// profile directory is removed only once the process has exited.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    runtime: tokio::runtime::Handle,
    pid: Option<u32>,
    profile_dir: Option<TempDir>,
}

impl BrowserSession {
    /// Launch a browser with a fresh profile directory.
    pub async fn launch(options: &RenderOptions) -> Result<Self, UrlError> {
        let launch_err = |reason: String| UrlError::BrowserLaunch { reason };

        let profile_dir = TempDir::with_prefix("msgtrigger-chrome-")
            .map_err(|e| launch_err(format!("profile dir: {e}")))?;

        let mut builder = CdpBrowserConfig::builder()
            .user_data_dir(profile_dir.path())
            .request_timeout(options.navigation_timeout);

        // chromiumoxide is headless unless asked otherwise
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(ref ua) = options.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        let config = builder
            .build()
            .map_err(|e| launch_err(format!("invalid browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| launch_err(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {}", e);
                }
            }
        });

        let pid = browser
            .get_mut_child()
            .and_then(|child| child.as_mut_inner().id());

        debug!(
            "Browser launched (pid {:?}, profile {})",
            pid,
            profile_dir.path().display()
        );
        Ok(Self {
            browser: Some(browser),
            handler,
            runtime: tokio::runtime::Handle::current(),
            pid,
            profile_dir: Some(profile_dir),
        })
    }

    /// OS process id of the browser, if the platform reports one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The throwaway profile directory, while the session is alive.
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile_dir.as_ref().map(TempDir::path)
    }

    async fn new_page(&self) -> Result<Page, UrlError> {
        let browser = self.browser.as_ref().ok_or_else(|| UrlError::BrowserLaunch {
            reason: "browser session already closed".to_string(),
        })?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| UrlError::BrowserLaunch {
                reason: format!("failed to open page: {e}"),
            })
    }

    /// Close the browser and wait for the process to exit.
    ///
    /// Close failures are logged, never returned: the render result is what
    /// the caller cares about. A browser that refuses to close is killed.
    pub async fn close(mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        if let Err(e) = browser.close().await {
            warn!("Browser close failed, killing process: {}", e);
            if let Some(Err(e)) = browser.kill().await {
                warn!("Browser kill failed: {}", e);
            }
        }
        match browser.wait().await {
            Ok(_) => debug!("Browser process exited"),
            Err(e) => warn!("Waiting for browser exit failed: {}", e),
        }
        if let Some(dir) = self.profile_dir.take() {
            if let Err(e) = dir.close() {
                warn!("Removing browser profile failed: {}", e);
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            warn!("Browser session dropped without close; killing process");
            let profile_dir = self.profile_dir.take();
            self.runtime.spawn(async move {
                if let Some(Err(e)) = browser.kill().await {
                    warn!("Browser kill on drop failed: {}", e);
                }
                let _ = browser.wait().await;
                drop(profile_dir);
            });
        }
        self.handler.abort();
    }
}

/// Navigate and then wait for the network to go quiet.
async fn navigate_until_idle(
    page: &Page,
    url: &str,
    options: &RenderOptions,
) -> Result<(), UrlError> {
    let nav_err = |e: chromiumoxide::error::CdpError| UrlError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    };

    // Subscribe before navigating so no request of the page load is missed.
    let mut sent = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(nav_err)?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(nav_err)?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(nav_err)?;

    page.goto(url).await.map_err(nav_err)?;
    debug!("Load event fired, waiting for network idle: {}", url);

    let mut tracker = IdleTracker::new(options.idle_max_inflight, Instant::now());
    loop {
        let quiet_deadline = tracker.quiet_since().map(|t| t + options.idle_settle);
        let wake_at = quiet_deadline.unwrap_or_else(|| Instant::now() + options.idle_settle);

        tokio::select! {
            biased;
            Some(ev) = sent.next() => tracker.request_started(ev.request_id.inner(), Instant::now()),
            Some(ev) = finished.next() => tracker.request_done(ev.request_id.inner(), Instant::now()),
            Some(ev) = failed.next() => tracker.request_done(ev.request_id.inner(), Instant::now()),
            _ = sleep_until(wake_at), if quiet_deadline.is_some() => {
                debug!("Network idle ({} in flight): {}", tracker.inflight(), url);
                return Ok(());
            }
            else => {
                return Err(UrlError::Navigation {
                    url: url.to_string(),
                    reason: "page event streams closed before network went idle".to_string(),
                });
            }
        }
    }
}

/// Counts in-flight requests and remembers when the count last dropped to
/// the idle threshold.
///
/// Request ids arrive on three separate event streams, so a completion can
/// be observed before its start; such ids are parked in `finished_early`.
#[derive(Debug)]
struct IdleTracker {
    max_inflight: usize,
    inflight: HashSet<String>,
    finished_early: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    fn new(max_inflight: usize, now: Instant) -> Self {
        Self {
            max_inflight,
            inflight: HashSet::new(),
            finished_early: HashSet::new(),
            quiet_since: Some(now),
        }
    }

    fn request_started(&mut self, id: &str, now: Instant) {
        if !self.finished_early.remove(id) {
            self.inflight.insert(id.to_string());
        }
        self.refresh(now);
    }

    fn request_done(&mut self, id: &str, now: Instant) {
        if !self.inflight.remove(id) {
            self.finished_early.insert(id.to_string());
        }
        self.refresh(now);
    }

    fn refresh(&mut self, now: Instant) {
        if self.inflight.len() <= self.max_inflight {
            self.quiet_since.get_or_insert(now);
        } else {
            self.quiet_since = None;
        }
    }

    fn quiet_since(&self) -> Option<Instant> {
        self.quiet_since
    }

    fn inflight(&self) -> usize {
        self.inflight.len()
    }
}
