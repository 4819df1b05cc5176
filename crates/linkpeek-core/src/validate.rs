//! URL validation.
//!
//! Two entry points share the same scheme rule (`http`/`https` only):
//! - [`validate_preview_url`] for absolute URLs handed to the service
//! - [`LinkFilter`] for hrefs found on the host page, which additionally
//!   drops in-page, pseudo-protocol and same-host links
//!
//! Nothing in here touches the network.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::ValidationError;

/// Href prefixes that never lead to a previewable page.
const SKIPPED_HREF_PREFIXES: &[&str] = &["#", "javascript:", "mailto:", "tel:", "sms:"];

/// Parse an absolute URL and enforce the scheme rule.
pub fn validate_preview_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim())?;
    check_scheme(url)
}

/// Resolve a (possibly relative) href against the page it appears on and
/// enforce the scheme rule.
pub fn resolve_href(href: &str, base: &Url) -> Result<Url, ValidationError> {
    let url = base.join(href.trim())?;
    check_scheme(url)
}

fn check_scheme(url: Url) -> Result<Url, ValidationError> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ValidationError::DisallowedScheme(other.to_string())),
    }
}

/// Whether the URL targets this machine or a non-public network.
///
/// Only literal addresses and `localhost` names are recognised; names that
/// resolve to private addresses are not caught here.
pub fn is_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_ipv4(&ip),
        Some(Host::Ipv6(ip)) => is_private_ipv6(&ip),
        None => true,
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();

    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        // 0.0.0.0/8
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (octets[0] == 100 && (64..=127).contains(&octets[1]))
        // 240.0.0.0/4 reserved
        || octets[0] >= 240
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&mapped);
    }

    let first = ip.segments()[0];

    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
}

/// Client-side filter deciding which links on a page get a preview.
///
/// Previews exist for outbound navigation only, so links back to the page's
/// own host are skipped along with fragments and pseudo-protocols.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    page: Url,
}

impl LinkFilter {
    pub fn new(page: Url) -> Self {
        Self { page }
    }

    /// Resolve `href` and return it if the link qualifies for a preview.
    pub fn qualify(&self, href: &str) -> Option<Url> {
        let trimmed = href.trim_start();
        if trimmed.is_empty() {
            return None;
        }

        let lowered = trimmed.to_ascii_lowercase();
        if SKIPPED_HREF_PREFIXES
            .iter()
            .any(|prefix| lowered.starts_with(prefix))
        {
            return None;
        }

        let url = resolve_href(trimmed, &self.page).ok()?;

        let same_host = match (url.host_str(), self.page.host_str()) {
            (Some(target), Some(page)) => target.eq_ignore_ascii_case(page),
            _ => false,
        };
        if same_host {
            return None;
        }

        Some(url)
    }
}
