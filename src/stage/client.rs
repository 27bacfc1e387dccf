//! HTTP client for externally hosted stages.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::error::StageError;
use super::types::{StageRequest, StageResponse};

pub struct HttpStageClient {
    client: Client,
    base_url: String,
}

impl HttpStageClient {
    /// Builds a client for `POST {base_url}/{stage}` with a connect timeout
    /// and a per-request deadline.
    pub fn new(base_url: String, timeout_seconds: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    pub async fn invoke(&self, request: &StageRequest) -> Result<Value, StageError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), request.stage);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StageError::Unavailable {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StageError::Rejected(message));
        }

        let body = response
            .json::<StageResponse>()
            .await
            .map_err(|err| StageError::Parse(err.to_string()))?;

        if !body.ok {
            return Err(StageError::Rejected(
                body.error
                    .unwrap_or_else(|| "stage reported failure".to_string()),
            ));
        }

        body.payload
            .ok_or_else(|| StageError::Parse("response missing payload".to_string()))
    }
}
