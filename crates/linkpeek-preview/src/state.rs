//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::service::PreviewService;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The fetch-and-sanitize pipeline.
    pub service: Arc<PreviewService<HttpFetcher>>,
}

impl AppState {
    /// Create a new application state from configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(config)?;
        let service = PreviewService::new(fetcher, config.allow_private_hosts);

        tracing::info!(
            fetch_timeout_ms = config.fetch_timeout.as_millis() as u64,
            max_body_bytes = config.max_body_bytes,
            "application state initialized"
        );

        Ok(Self {
            service: Arc::new(service),
        })
    }
}
