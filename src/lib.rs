//! # msgtrigger
//!
//! Process "send message" jobs: find the URLs in a chat message, fetch each
//! one (or print it to PDF in headless Chromium), and deliver the message as
//! plain text or as text with the PDFs attached.
//!
//! ## Pipeline Overview
//!
//! ```text
//! job payload
//!  │
//!  ├─ 1. Job        validate the queue payload into a JobInput
//!  ├─ 2. Extract    URLs in message order, duplicates kept
//!  ├─ 3. Fetch /    GET raw bytes, or render an A4 PDF
//!  │     Render     (one independent attempt per URL; failures are dropped)
//!  ├─ 4. Encode     bytes → base64
//!  ├─ 5. Decide     text-only, or text+media for PDF jobs with ≥1 success
//!  └─ 6. Deliver    exactly one call to the chat-delivery API
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msgtrigger::{MessageTrigger, PipelineConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .api_base_url("http://localhost:3000")
//!         .build()?;
//!     let trigger = MessageTrigger::new(config)?;
//!     let result = trigger
//!         .run_payload(&json!({
//!             "gerar_pdf": "sim",
//!             "mensagem": "confira www.site.com",
//!             "numero": "5511999999999",
//!             "token": "secret",
//!             "key": "instance-1"
//!         }))
//!         .await?;
//!     eprintln!("{} sent, {} attachment(s)", result.mode.label(), result.media.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `msgtrigger` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Rendering needs a Chrome or Chromium install; set `chrome_path` when it is
//! not on the default search path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod delivery;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod trigger;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use delivery::{ChatApiClient, ChatDelivery, DryRunDelivery, MediaMessage, TextMessage};
pub use error::{DeliveryError, TriggerError, UrlError};
pub use job::{JobInput, SendMessagePayload};
pub use output::{DispatchMode, DispatchResult, MaterializedContent, RunStats, UrlOutcome};
pub use pipeline::extract::extract_urls;
pub use pipeline::fetch::{HttpFetcher, PageFetcher};
pub use pipeline::render::{ChromiumRenderer, PdfRenderer};
pub use progress::{DispatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use trigger::{run_job, run_job_sync, MessageTrigger};
