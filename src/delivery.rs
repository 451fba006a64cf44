//! Outbound chat delivery.
//!
//! [`ChatDelivery`] is the seam the pipeline driver sends through. Two
//! implementations ship with the crate:
//!
//! - [`ChatApiClient`] posts JSON to the chat-delivery HTTP API;
//! - [`DryRunDelivery`] only logs, for local runs and smoke tests.
//!
//! Request bodies keep the delivery API's field names (`instancia`,
//! `mensagem`, `numero`, `token`, `media`).

use crate::config::PipelineConfig;
use crate::error::{DeliveryError, TriggerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A plain text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub instancia: String,
    pub mensagem: String,
    pub numero: String,
    pub token: String,
}

/// A text message with base64 attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMessage {
    pub instancia: String,
    pub mensagem: String,
    pub numero: String,
    pub token: String,
    pub media: Vec<String>,
}

/// Sends the job's single outbound message.
#[async_trait]
pub trait ChatDelivery: Send + Sync {
    async fn send_message(&self, msg: &TextMessage) -> Result<(), DeliveryError>;

    async fn send_message_media(&self, msg: &MediaMessage) -> Result<(), DeliveryError>;
}

/// Optional status envelope some delivery deployments return on 2xx.
#[derive(Debug, Default, Deserialize)]
struct DeliveryResponse {
    success: Option<bool>,
    error: Option<String>,
    message: Option<String>,
}

/// [`ChatDelivery`] over the chat-delivery HTTP API.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    client: reqwest::Client,
    text_url: String,
    media_url: String,
}

impl ChatApiClient {
    pub fn new(config: &PipelineConfig) -> Result<Self, TriggerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.delivery_timeout_secs))
            .build()
            .map_err(|e| TriggerError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Use a caller-supplied client, e.g. to share a connection pool.
    pub fn with_client(config: &PipelineConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            text_url: config.endpoint(&config.text_path),
            media_url: config.endpoint(&config.media_path),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), DeliveryError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            // The body is diagnostic only here; the status is the error.
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;

        let envelope: DeliveryResponse = serde_json::from_str(&text).unwrap_or_default();
        if envelope.success == Some(false) {
            let reason = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "unknown_error".to_owned());
            warn!("Delivery API rejected message: {}", reason);
            return Err(DeliveryError::Rejected(reason));
        }

        debug!("Delivery API answered {}", status);
        Ok(())
    }
}

#[async_trait]
impl ChatDelivery for ChatApiClient {
    async fn send_message(&self, msg: &TextMessage) -> Result<(), DeliveryError> {
        info!("Sending text message to {} via {}", msg.numero, msg.instancia);
        self.post(&self.text_url, msg).await
    }

    async fn send_message_media(&self, msg: &MediaMessage) -> Result<(), DeliveryError> {
        info!(
            "Sending message with {} attachment(s) to {} via {}",
            msg.media.len(),
            msg.numero,
            msg.instancia
        );
        self.post(&self.media_url, msg).await
    }
}

/// [`ChatDelivery`] that logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunDelivery;

#[async_trait]
impl ChatDelivery for DryRunDelivery {
    async fn send_message(&self, msg: &TextMessage) -> Result<(), DeliveryError> {
        info!(
            "[dry-run] text to {} via {}: {} chars",
            msg.numero,
            msg.instancia,
            msg.mensagem.chars().count()
        );
        Ok(())
    }

    async fn send_message_media(&self, msg: &MediaMessage) -> Result<(), DeliveryError> {
        let bytes: usize = msg.media.iter().map(String::len).sum();
        info!(
            "[dry-run] text+media to {} via {}: {} attachment(s), {} bytes base64",
            msg.numero,
            msg.instancia,
            msg.media.len(),
            bytes
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_message_uses_wire_names() {
        let m = MediaMessage {
            instancia: "inst".into(),
            mensagem: "oi".into(),
            numero: "55".into(),
            token: "t".into(),
            media: vec!["JVBERg==".into()],
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["instancia"], "inst");
        assert_eq!(json["media"][0], "JVBERg==");
    }

    #[test]
    fn endpoints_built_from_config() {
        let config = PipelineConfig::builder()
            .api_base_url("http://chat:8080/")
            .text_path("msg/text")
            .build()
            .unwrap();
        let client = ChatApiClient::new(&config).unwrap();
        assert_eq!(client.text_url, "http://chat:8080/msg/text");
        assert_eq!(client.media_url, "http://chat:8080/send-message-media");
    }

    #[tokio::test]
    async fn dry_run_always_succeeds() {
        let d = DryRunDelivery;
        let text = TextMessage {
            instancia: "i".into(),
            mensagem: "m".into(),
            numero: "n".into(),
            token: "t".into(),
        };
        assert!(d.send_message(&text).await.is_ok());
    }
}
