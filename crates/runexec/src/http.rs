//! reqwest-backed [`ExecutionClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{ClientError, ExecutionClient, RunRequest, RunResponse, RUN_PATH};

/// Upper bound for a single run round trip; expiry counts as unreachable.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts run requests to `<base_url>/run`.
/// （將執行請求送往 `<base_url>/run`。）
#[derive(Debug, Clone)]
pub struct HttpExecutionClient {
    client: Client,
    endpoint: String,
}

impl HttpExecutionClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), RUN_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn submit(&self, request: RunRequest) -> Result<RunResponse, ClientError> {
        debug!(endpoint = %self.endpoint, language = %request.language, "submitting run");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                warn!(endpoint = %self.endpoint, error = %err, "execution service request failed");
                ClientError::Transport(err.to_string())
            })?;

        // The status code is not consulted: error payloads arrive as JSON bodies.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        debug!(%status, bytes = body.len(), "execution service replied");
        RunResponse::from_json(&body)
    }
}
