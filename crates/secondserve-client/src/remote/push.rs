use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use secondserve_shared::backend::{BackendResult, PushRelay};
use secondserve_shared::push::PushMessage;

use super::json;

/// Per-message receipt returned by the relay.
#[derive(Debug, Deserialize)]
struct Ticket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    data: Vec<Ticket>,
}

/// Expo push relay client. One POST per batch; the caller keeps batches
/// within the relay limit.
pub struct ExpoPushRelay {
    http: reqwest::Client,
    endpoint: String,
}

impl ExpoPushRelay {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushRelay for ExpoPushRelay {
    async fn send_batch(&self, messages: &[PushMessage]) -> BackendResult<()> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(messages)
            .send()
            .await
            .map_err(super::transport)?;

        let receipt: SendResponse = json(resp).await?;
        let failed: Vec<&Ticket> = receipt.data.iter().filter(|t| t.status != "ok").collect();
        if !failed.is_empty() {
            warn!(
                failed = failed.len(),
                first = failed[0].message.as_deref().unwrap_or(""),
                "Relay rejected some push messages"
            );
        }
        debug!(sent = messages.len(), "Push batch delivered to relay");
        Ok(())
    }
}
