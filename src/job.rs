//! Job schema: the loosely-typed queue payload and its validated form.
//!
//! The queue delivers a JSON object with Portuguese field names
//! (`gerar_pdf`, `mensagem`, `numero`, `token`, `key`). [`SendMessagePayload`]
//! mirrors that wire shape exactly; [`JobInput`] is what the pipeline works
//! with. Conversion happens once, at the boundary, via `TryFrom`.

use crate::error::TriggerError;
use serde::{Deserialize, Serialize};

/// The raw job payload as published on the send-message queue.
///
/// Every field is optional here so that deserialisation never fails on a
/// missing key; [`JobInput::try_from`] decides what is actually required.
/// Unknown extra fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    /// `"sim"` to render each URL to PDF and attach it; `"nao"` otherwise.
    #[serde(default)]
    pub gerar_pdf: Option<String>,
    /// Free-form message text.
    #[serde(default)]
    pub mensagem: Option<String>,
    /// Recipient number.
    #[serde(default)]
    pub numero: Option<String>,
    /// Delivery API token.
    #[serde(default)]
    pub token: Option<String>,
    /// Chat instance / channel key.
    #[serde(default)]
    pub key: Option<String>,
}

impl SendMessagePayload {
    /// Parse a payload from an arbitrary JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, TriggerError> {
        if !value.is_object() {
            return Err(TriggerError::invalid_job(format!(
                "expected a JSON object, got {}",
                json_kind(value)
            )));
        }
        serde_json::from_value(value.clone()).map_err(|e| TriggerError::invalid_job(e.to_string()))
    }
}

/// A validated send-message job. Immutable for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub message: String,
    pub recipient: String,
    pub auth_token: String,
    pub channel_key: String,
    pub render_as_pdf: bool,
}

impl TryFrom<SendMessagePayload> for JobInput {
    type Error = TriggerError;

    fn try_from(p: SendMessagePayload) -> Result<Self, Self::Error> {
        let render_as_pdf = parse_pdf_flag(p.gerar_pdf.as_deref())?;
        Ok(JobInput {
            message: p.mensagem.unwrap_or_default(),
            recipient: required("numero", p.numero)?,
            auth_token: required("token", p.token)?,
            channel_key: required("key", p.key)?,
            render_as_pdf,
        })
    }
}

impl TryFrom<&serde_json::Value> for JobInput {
    type Error = TriggerError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        SendMessagePayload::from_value(value)?.try_into()
    }
}

/// Map the `gerar_pdf` flag. Absent or empty means "no".
fn parse_pdf_flag(raw: Option<&str>) -> Result<bool, TriggerError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "sim" => Ok(true),
        "nao" | "não" | "" => Ok(false),
        other => Err(TriggerError::invalid_job(format!(
            "gerar_pdf must be \"sim\" or \"nao\", got {other:?}"
        ))),
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, TriggerError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TriggerError::invalid_job(format!(
            "missing or empty field `{field}`"
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
