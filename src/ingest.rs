//! Inbound webhook routing.
//!
//! Maps a messaging-provider webhook to a debounce key. One key per
//! sender per company, so two companies talking to the same number never
//! share a burst.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Sender used by the provider for status broadcasts; never a conversation.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// An accepted message, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Debounce key: `"{from}-{company_id}"`.
    pub key: String,
    pub text: String,
    pub from: String,
    pub message_id: Option<String>,
    pub company_id: String,
}

/// What to do with a well-formed message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Accepted(InboundMessage),
    /// Acknowledged but not buffered.
    Ignored(&'static str),
}

/// Route a webhook for `company_id`.
///
/// Only `"message"` events are supported; anything else is an error the
/// listener should report back to the provider. Broadcasts, empty bodies
/// and requests without a company are acknowledged and dropped.
pub fn route(envelope: WebhookEnvelope, company_id: &str) -> Result<Disposition> {
    if envelope.event != "message" {
        return Err(Error::UnsupportedEvent(envelope.event));
    }

    let MessagePayload { body, from, id } = envelope.payload;

    if from == STATUS_BROADCAST {
        return Ok(Disposition::Ignored("status broadcast"));
    }
    let Some(text) = body.filter(|b| !b.is_empty()) else {
        return Ok(Disposition::Ignored("empty body"));
    };
    if company_id.is_empty() {
        return Ok(Disposition::Ignored("missing company id"));
    }
    if from.is_empty() {
        return Ok(Disposition::Ignored("missing sender"));
    }

    Ok(Disposition::Accepted(InboundMessage {
        key: format!("{from}-{company_id}"),
        text,
        from,
        message_id: id,
        company_id: company_id.to_string(),
    }))
}

/// Parse a JSON webhook body and route it.
pub fn route_json(body: &str, company_id: &str) -> Result<Disposition> {
    let envelope: WebhookEnvelope = serde_json::from_str(body)?;
    route(envelope, company_id)
}
