//! Page fetcher.
//!
//! One GET per call, no retries. The whole exchange (connect, headers and
//! body) runs under a single wall-clock timeout, and the body is streamed
//! against a size ceiling so oversized pages are abandoned mid-transfer.
//!
//! Every redirect hop is held to the same private-host rule as the
//! requested URL.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use linkpeek_core::{FailureKind, is_private_host};
use reqwest::{Client, StatusCode, header, redirect};
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Maximum number of redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Errors that can occur while fetching a destination page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("destination responded with {0}")]
    HttpStatus(StatusCode),

    #[error("unsupported content type: {0:?}")]
    UnsupportedContentType(Option<String>),

    #[error("redirect to disallowed host: {0}")]
    DisallowedRedirect(String),

    #[error("more than {MAX_REDIRECTS} redirects")]
    TooManyRedirects,

    #[error("response too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// The user-facing failure this error maps to.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::HostNotFound(_) => FailureKind::HostNotFound,
            Self::HttpStatus(StatusCode::FORBIDDEN) => FailureKind::Forbidden,
            Self::HttpStatus(StatusCode::NOT_FOUND) => FailureKind::NotFound,
            Self::HttpStatus(_) => FailureKind::GenericFetchFailure,
            Self::UnsupportedContentType(_) => FailureKind::UnsupportedContentType,
            Self::DisallowedRedirect(_) => FailureKind::DisallowedHost,
            Self::TooLarge { .. } | Self::TooManyRedirects | Self::Transport(_) => {
                FailureKind::GenericFetchFailure
            }
        }
    }
}

/// A fetched HTML document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Address the body was served from, after redirects.
    pub final_url: Url,
    /// Body decoded as UTF-8 (invalid sequences replaced).
    pub body: String,
}

/// Retrieves destination pages.
///
/// Implemented by [`HttpFetcher`] in production and by in-memory fakes in tests.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// reqwest-backed [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.fetch_timeout)
            .redirect(redirect_policy(config.allow_private_hosts))
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn fetch_inner(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let is_html = content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        if !is_html {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        if let Some(content_length) = response.content_length()
            && content_length > self.max_body_bytes
        {
            return Err(FetchError::TooLarge {
                size: content_length,
                max: self.max_body_bytes,
            });
        }

        let final_url = response.url().clone();
        let bytes = self.read_with_limit(response).await?;

        Ok(FetchedPage {
            final_url,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Read response body with streaming size limit.
    async fn read_with_limit(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.classify(e))?;

            let new_size = body.len() as u64 + chunk.len() as u64;
            if new_size > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    size: new_size,
                    max: self.max_body_bytes,
                });
            }

            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if let Some(refused) = find_source::<FetchError>(&err) {
            return refused.clone();
        }
        if err.is_timeout() {
            return FetchError::Timeout(self.timeout);
        }
        if is_dns_failure(&err) {
            let host = err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or_default()
                .to_string();
            return FetchError::HostNotFound(host);
        }
        FetchError::Transport(err.to_string())
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        // Covers connect, redirects and the whole body read.
        match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}

/// Follow up to [`MAX_REDIRECTS`] hops, refusing any hop to a private host
/// unless private hosts are allowed.
fn redirect_policy(allow_private_hosts: bool) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(FetchError::TooManyRedirects);
        }
        if !allow_private_hosts && is_private_host(attempt.url()) {
            let host = attempt.url().host_str().unwrap_or_default().to_string();
            tracing::warn!(host = %host, "refusing redirect to private host");
            return attempt.error(FetchError::DisallowedRedirect(host));
        }
        attempt.follow()
    })
}

/// First error of type `E` in the source chain of `err`.
fn find_source<'a, E: std::error::Error + 'static>(err: &'a reqwest::Error) -> Option<&'a E> {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(found) = e.downcast_ref::<E>() {
            return Some(found);
        }
        source = e.source();
    }
    None
}

/// Walk the error chain looking for a resolver failure.
///
/// The system resolver reports lookup failures as untyped `io::Error`s
/// wrapped by hyper, so only the message identifies them.
fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_ascii_lowercase();
        if msg.contains("dns error")
            || msg.contains("failed to lookup address")
            || msg.contains("name or service not known")
            || msg.contains("no such host")
        {
            return true;
        }
        source = e.source();
    }
    false
}
