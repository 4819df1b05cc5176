//! Client for the preview service.

use std::future::Future;

use linkpeek_core::{FailureKind, PreviewRequest, PreviewResult};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Where the preview service listens by default.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/api/preview";

/// Requests previews from the service.
///
/// Never fails: anything that goes wrong reaching the service comes back as
/// a [`PreviewResult::Failed`], which the controller caches like any other.
pub trait PreviewClient: Send + Sync {
    fn request_preview(&self, url: &Url) -> impl Future<Output = PreviewResult> + Send;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("preview service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// reqwest-backed [`PreviewClient`] posting to `POST /api/preview`.
#[derive(Debug, Clone)]
pub struct HttpPreviewClient {
    client: Client,
    endpoint: Url,
}

impl HttpPreviewClient {
    pub fn new(endpoint: Url) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn try_request(&self, url: &Url) -> Result<PreviewResult, ClientError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&PreviewRequest::new(url.as_str()))
            .send()
            .await?;

        // Error statuses still carry `{ "error": ... }`; the body decides.
        let status = response.status();
        let body = response.bytes().await?;
        let result: PreviewResult = serde_json::from_slice(&body)?;

        tracing::debug!(url = %url, status = status.as_u16(), success = result.is_success(), "preview received");
        Ok(result)
    }
}

impl PreviewClient for HttpPreviewClient {
    async fn request_preview(&self, url: &Url) -> PreviewResult {
        match self.try_request(url).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "preview request failed");
                PreviewResult::failed(FailureKind::GenericFetchFailure)
            }
        }
    }
}
