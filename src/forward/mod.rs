//! Dashboard delivery.
//!
//! Posts each settled burst to the dashboard's webhook endpoint, tagged
//! with the sender, message and company of the submission that last
//! touched the key.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::engine::Consumer;
use crate::error::Result;
use crate::ingest::InboundMessage;

/// Path appended to the dashboard base URL.
pub const WEBHOOK_PATH: &str = "/api/webhooks/whatsapp";

/// Builds per-message consumers sharing one HTTP client.
#[derive(Clone)]
pub struct DashboardForwarder {
    client: reqwest::Client,
    endpoint: Arc<SecretString>,
}

impl DashboardForwarder {
    pub fn new(base_url: &SecretString) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &SecretString) -> Self {
        let endpoint = format!(
            "{}{WEBHOOK_PATH}",
            base_url.expose_secret().trim_end_matches('/')
        );
        Self {
            client,
            endpoint: Arc::new(SecretString::from(endpoint)),
        }
    }

    /// Consumer delivering on behalf of `message`.
    pub fn consumer_for(&self, message: &InboundMessage) -> Arc<dyn Consumer> {
        Arc::new(DashboardDelivery {
            client: self.client.clone(),
            endpoint: Arc::clone(&self.endpoint),
            from: message.from.clone(),
            message_id: message.message_id.clone(),
            company_id: message.company_id.clone(),
        })
    }
}

/// JSON body posted to the dashboard.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMessage<'a> {
    pub message: &'a str,
    pub from: &'a str,
    pub id: Option<&'a str>,
    pub company_id: &'a str,
}

struct DashboardDelivery {
    client: reqwest::Client,
    endpoint: Arc<SecretString>,
    from: String,
    message_id: Option<String>,
    company_id: String,
}

#[async_trait]
impl Consumer for DashboardDelivery {
    async fn deliver(&self, payload: String, key: String) -> anyhow::Result<()> {
        let body = DashboardMessage {
            message: &payload,
            from: &self.from,
            id: self.message_id.as_deref(),
            company_id: &self.company_id,
        };

        debug!(key = key.as_str(), bytes = payload.len(), "posting burst to dashboard");

        self.client
            .post(self.endpoint.expose_secret())
            .json(&body)
            .send()
            .await
            .context("dashboard request failed")?
            .error_for_status()
            .context("dashboard rejected burst")?;

        Ok(())
    }
}
