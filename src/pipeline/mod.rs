//! Pipeline stages for a send-message job.
//!
//! Each submodule implements one step. Fetch and render sit behind traits
//! ([`fetch::PageFetcher`], [`render::PdfRenderer`]).
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ materialize ──▶ dispatch
//! (regex)      │  fetch (reqwest)      (text | text+media)
//!              │  render (chromium)
//!              └─ encode (base64)
//! ```
//!
//! 1. [`extract`]     : find every URL in the message, in order
//! 2. [`fetch`]       : GET raw bytes for a URL
//! 3. [`render`]      : print a URL to an A4 PDF in a throwaway browser
//! 4. [`encode`]      : base64-wrap the bytes for the delivery API
//! 5. [`materialize`] : run 2/3 + 4 per URL with failure isolation
//! 6. [`dispatch`]    : pick the outbound send from the aggregate result

pub mod dispatch;
pub mod encode;
pub mod extract;
pub mod fetch;
pub mod materialize;
pub mod render;
