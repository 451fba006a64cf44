//! Error types for the msgtrigger library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`TriggerError`] (**fatal**): the job cannot complete (malformed
//!   payload, bad configuration, the final send failed). Returned as
//!   `Err(TriggerError)` from [`crate::trigger::MessageTrigger::run`].
//!
//! * [`UrlError`] (**non-fatal**): a single URL could not be fetched or
//!   rendered. Stored inside [`crate::output::UrlOutcome`]; the URL is left
//!   out of the media list and every other URL is still attempted.
//!
//! * [`DeliveryError`]: the chat-delivery collaborator refused or could not
//!   be reached. Always surfaces to the caller wrapped in
//!   [`TriggerError::Delivery`] so the queue runtime can apply its own retry
//!   policy.

use thiserror::Error;

/// All fatal errors returned by the msgtrigger library.
///
/// Per-URL failures use [`UrlError`] and are stored in
/// [`crate::output::UrlOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TriggerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The queue payload does not match the send-message job schema.
    #[error("Invalid job payload: {reason}")]
    InvalidJob { reason: String },

    // ── Delivery errors ───────────────────────────────────────────────────
    /// The outbound send call failed. Never swallowed.
    #[error("Failed to deliver message to '{recipient}': {source}")]
    Delivery {
        recipient: String,
        #[source]
        source: DeliveryError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriggerError {
    pub(crate) fn invalid_job(reason: impl Into<String>) -> Self {
        TriggerError::InvalidJob {
            reason: reason.into(),
        }
    }
}

/// A non-fatal error for a single URL.
///
/// Serialisable so a [`crate::output::UrlOutcome`] can be reported as JSON.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UrlError {
    /// The request or navigation did not finish within its bound.
    #[error("'{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("Request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("'{url}' answered HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The browser could not be started.
    #[error("Browser launch failed: {reason}")]
    BrowserLaunch { reason: String },

    /// The browser could not load the page.
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page loaded but printing it to PDF failed.
    #[error("PDF export of '{url}' failed: {reason}")]
    PdfPrint { url: String, reason: String },
}

/// Errors raised by a [`crate::delivery::ChatDelivery`] implementation.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The delivery API could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The delivery API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The delivery API accepted the request but reported a failure.
    #[error("rejected: {0}")]
    Rejected(String),
}
