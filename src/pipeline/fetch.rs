//! Raw content fetch: one GET, arbitrary binary body.
//!
//! [`PageFetcher`] is the seam the materializer calls; [`HttpFetcher`] is the
//! reqwest-backed implementation. No retries: a failed URL is simply left
//! out of the job's media list.

use crate::config::PipelineConfig;
use crate::error::{TriggerError, UrlError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches the raw bytes behind a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the response body.
    ///
    /// `url` is already normalised (has an `http://` or `https://` scheme).
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UrlError>;
}

/// [`PageFetcher`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: Option<u64>,
}

impl HttpFetcher {
    /// Build a fetcher from the pipeline config.
    ///
    /// Only `fetch_timeout_secs` and `user_agent` are read.
    pub fn new(config: &PipelineConfig) -> Result<Self, TriggerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.fetch_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder
            .build()
            .map_err(|e| TriggerError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }

    /// Wrap an existing client, e.g. to share a connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout_secs: None,
        }
    }

    fn map_transport_error(&self, url: &str, e: reqwest::Error) -> UrlError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => UrlError::Timeout {
                url: url.to_string(),
                secs,
            },
            _ => UrlError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UrlError> {
        info!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UrlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let fetcher = HttpFetcher::new(&PipelineConfig::default()).unwrap();
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, UrlError::Request { .. }), "got: {err:?}");
    }

    #[test]
    fn builds_with_timeout_and_user_agent() {
        let config = PipelineConfig::builder()
            .fetch_timeout_secs(Some(5))
            .user_agent("msgtrigger-test")
            .build()
            .unwrap();
        let fetcher = HttpFetcher::new(&config).unwrap();
        assert_eq!(fetcher.timeout_secs, Some(5));
    }
}
