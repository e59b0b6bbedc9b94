use std::time::Duration;

use async_trait::async_trait;
use cable_protocol::BroadcastPayload;

use super::{BroadcastAdapter, BroadcastError};

/// POSTs every payload as JSON to a broadcast endpoint.
///
/// Holds only immutable configuration; the reqwest client pools connections
/// internally, so one adapter serves every concurrent call.
#[derive(Debug, Clone)]
pub struct HttpBroadcastAdapter {
    url: String,
    secret: Option<String>,
    http: reqwest::Client,
}

impl HttpBroadcastAdapter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BroadcastError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            secret: None,
            http,
        })
    }

    /// Send `Authorization: Bearer <secret>` with every request.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BroadcastAdapter for HttpBroadcastAdapter {
    async fn broadcast(&self, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        tracing::debug!(url = %self.url, "posting broadcast");

        let mut request = self.http.post(&self.url).json(payload);
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, %status, "broadcast endpoint rejected payload");
            return Err(BroadcastError::Status(status.as_u16()));
        }
        Ok(())
    }
}
