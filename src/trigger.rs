//! Pipeline driver: one send-message job in, one outbound send out.
//!
//! [`MessageTrigger`] wires the stages together around three swappable
//! collaborators (fetcher, renderer, delivery). It holds no per-job state,
//! so one instance can serve any number of concurrent jobs behind an `Arc`.

use crate::config::PipelineConfig;
use crate::delivery::{ChatApiClient, ChatDelivery, MediaMessage, TextMessage};
use crate::error::TriggerError;
use crate::job::JobInput;
use crate::output::{successes, DispatchMode, DispatchResult, RunStats};
use crate::pipeline::fetch::{HttpFetcher, PageFetcher};
use crate::pipeline::render::{ChromiumRenderer, PdfRenderer};
use crate::pipeline::{dispatch, extract, materialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs send-message jobs.
#[derive(Clone)]
pub struct MessageTrigger {
    config: PipelineConfig,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn PdfRenderer>,
    delivery: Arc<dyn ChatDelivery>,
}

impl MessageTrigger {
    /// Build a trigger with the default collaborators: reqwest fetcher,
    /// Chromium renderer and the HTTP delivery client.
    pub fn new(config: PipelineConfig) -> Result<Self, TriggerError> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        let renderer = Arc::new(ChromiumRenderer::new(&config));
        let delivery = Arc::new(ChatApiClient::new(&config)?);
        Ok(Self::with_parts(config, fetcher, renderer, delivery))
    }

    /// Build a trigger from explicit collaborators.
    pub fn with_parts(
        config: PipelineConfig,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Arc<dyn PdfRenderer>,
        delivery: Arc<dyn ChatDelivery>,
    ) -> Self {
        Self {
            config,
            fetcher,
            renderer,
            delivery,
        }
    }

    /// Replace the delivery collaborator, keeping everything else.
    pub fn with_delivery(mut self, delivery: Arc<dyn ChatDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a raw queue payload, then [`run`](Self::run) it.
    pub async fn run_payload(
        &self,
        payload: &serde_json::Value,
    ) -> Result<DispatchResult, TriggerError> {
        let job = JobInput::try_from(payload)?;
        self.run(&job).await
    }

    /// Run one job.
    ///
    /// # Returns
    /// `Ok(DispatchResult)` once the outbound send succeeded, even if some or
    /// all URLs failed to materialize (see `result.failures`).
    ///
    /// # Errors
    /// Only the final send can fail the job: [`TriggerError::Delivery`].
    pub async fn run(&self, job: &JobInput) -> Result<DispatchResult, TriggerError> {
        let total_start = Instant::now();
        info!(
            "Sending message to {} (pdf: {})",
            job.recipient, job.render_as_pdf
        );

        // ── Step 1: Extract URLs ─────────────────────────────────────────────
        let urls = extract::extract_urls(&job.message);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_job_start(urls.len());
        }

        // ── Step 2: Materialize each URL ─────────────────────────────────────
        let materialize_start = Instant::now();
        let outcomes = materialize::materialize(
            &urls,
            job.render_as_pdf,
            self.fetcher.as_ref(),
            self.renderer.as_ref(),
            &self.config,
        )
        .await;
        let materialize_duration_ms = materialize_start.elapsed().as_millis() as u64;

        let media = successes(&outcomes);
        let failures: Vec<_> = outcomes.into_iter().filter(|o| !o.is_success()).collect();
        info!(
            "Materialized {}/{} URL(s) in {}ms",
            media.len(),
            urls.len(),
            materialize_duration_ms
        );

        // ── Step 3: Decide and send ──────────────────────────────────────────
        let mode = dispatch::decide(&media, job.render_as_pdf);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_dispatch(mode.label(), mode.media_count());
        }
        self.send(job, &mode).await?;

        let stats = RunStats {
            urls_found: urls.len(),
            urls_materialized: media.len(),
            urls_failed: failures.len(),
            materialize_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Job complete: {} sent to {}, {}ms total",
            mode.label(),
            job.recipient,
            stats.total_duration_ms
        );

        Ok(DispatchResult {
            recipient: job.recipient.clone(),
            urls,
            media,
            mode,
            failures,
            stats,
        })
    }

    async fn send(&self, job: &JobInput, mode: &DispatchMode) -> Result<(), TriggerError> {
        let sent = match mode {
            DispatchMode::TextWithMedia { media } => {
                debug!("Dispatching text+media ({} attachments)", media.len());
                self.delivery
                    .send_message_media(&MediaMessage {
                        instancia: job.channel_key.clone(),
                        mensagem: job.message.clone(),
                        numero: job.recipient.clone(),
                        token: job.auth_token.clone(),
                        media: media.clone(),
                    })
                    .await
            }
            DispatchMode::TextOnly => {
                debug!("Dispatching text only");
                self.delivery
                    .send_message(&TextMessage {
                        instancia: job.channel_key.clone(),
                        mensagem: job.message.clone(),
                        numero: job.recipient.clone(),
                        token: job.auth_token.clone(),
                    })
                    .await
            }
        };
        sent.map_err(|source| TriggerError::Delivery {
            recipient: job.recipient.clone(),
            source,
        })
    }
}

/// Run one job with the default collaborators.
///
/// Convenience for one-off calls; long-running workers should build one
/// [`MessageTrigger`] and reuse it.
pub async fn run_job(
    job: &JobInput,
    config: &PipelineConfig,
) -> Result<DispatchResult, TriggerError> {
    MessageTrigger::new(config.clone())?.run(job).await
}

/// Synchronous wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync(
    job: &JobInput,
    config: &PipelineConfig,
) -> Result<DispatchResult, TriggerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TriggerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_job(job, config))
}
