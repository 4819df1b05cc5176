//! The preview pipeline: validate, fetch, sanitize, filter.

use linkpeek_core::{PreviewPage, is_private_host, validate_preview_url};

use crate::error::PreviewError;
use crate::fetch::PageFetcher;
use crate::filter::DefenseFilter;
use crate::sanitize::HtmlSanitizer;
use crate::title::extract_title;

/// Stateless preview service. Each call makes at most one outbound request.
pub struct PreviewService<F> {
    fetcher: F,
    sanitizer: HtmlSanitizer,
    filter: DefenseFilter,
    allow_private_hosts: bool,
}

impl<F: PageFetcher> PreviewService<F> {
    pub fn new(fetcher: F, allow_private_hosts: bool) -> Self {
        Self {
            fetcher,
            sanitizer: HtmlSanitizer::new(),
            filter: DefenseFilter::new(),
            allow_private_hosts,
        }
    }

    /// Produce a sanitized preview of `url`.
    ///
    /// Stages run strictly in order and the first failure short-circuits,
    /// so a rejected URL never reaches the fetcher.
    pub async fn get_preview(&self, url: Option<&str>) -> Result<PreviewPage, PreviewError> {
        let raw = url
            .filter(|s| !s.trim().is_empty())
            .ok_or(PreviewError::MissingUrl)?;

        let url = validate_preview_url(raw)?;
        if !self.allow_private_hosts && is_private_host(&url) {
            return Err(PreviewError::DisallowedHost(
                url.host_str().unwrap_or_default().to_string(),
            ));
        }

        tracing::debug!(url = %url, "fetching destination");
        let page = self.fetcher.fetch(&url).await?;

        let title = extract_title(&page.body);
        let sanitized = self.sanitizer.sanitize(&page.body, &page.final_url);
        let html = self.filter.clean(&sanitized);

        tracing::info!(
            url = %url,
            final_url = %page.final_url,
            raw_bytes = page.body.len(),
            html_bytes = html.len(),
            "preview generated"
        );

        Ok(PreviewPage::new(html, title, url.to_string()))
    }
}
