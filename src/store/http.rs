use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, warn};

use crate::store::{QuotaStore, StoreError};
use crate::types::counter::QuotaCounter;

/// HTTP client for the counter document store.
///
/// One document per user id at `{api_url}/counters/{user_id}`. PATCH carries
/// merge semantics on the server side, so concurrent writers from other
/// devices never clobber fields they did not send.
pub struct HttpQuotaStore {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpQuotaStore {
    pub fn new(api_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            // Keep TCP connections alive to the store; counter traffic is
            // frequent and tiny, so handshake overhead dominates otherwise
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            // Per-call bound so a dead network fails fast instead of hanging
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .expect("Failed to build counter store HTTP client");

        Self {
            client,
            api_url,
            api_key,
        }
    }

    fn counter_url(&self, user_id: &str) -> String {
        format!("{}/counters/{}", self.api_url, user_id)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    fn transport_error(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            warn!("Counter store call timed out");
            StoreError::Timeout
        } else {
            error!(error = %err, "Counter store unreachable");
            StoreError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl QuotaStore for HttpQuotaStore {
    async fn load(&self, user_id: &str) -> Result<Option<QuotaCounter>, StoreError> {
        let resp = self
            .authorize(self.client.get(self.counter_url(user_id)))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Counter store returned non-2xx on load");
            return Err(StoreError::Api(resp.status().as_u16()));
        }

        let counter = resp.json::<QuotaCounter>().await.map_err(|e| {
            error!(error = %e, "Failed to parse counter document");
            StoreError::Parse(e.to_string())
        })?;

        Ok(Some(counter))
    }

    async fn merge_write(&self, user_id: &str, counter: &QuotaCounter) -> Result<(), StoreError> {
        let resp = self
            .authorize(self.client.patch(self.counter_url(user_id)))
            .header("Content-Type", "application/json")
            .json(counter)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Counter store returned non-2xx on merge write");
            return Err(StoreError::Api(resp.status().as_u16()));
        }

        Ok(())
    }
}
