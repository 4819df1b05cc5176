//! Failure taxonomy shared by the service and the client.

use thiserror::Error;

/// Every way a preview can fail, as seen by a user.
///
/// The service converts its internal errors into one of these before anything
/// crosses the HTTP boundary, so the messages here are the only error text a
/// client ever displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request carried no URL.
    MissingUrl,
    /// The URL could not be parsed.
    InvalidUrl,
    /// The scheme is not `http` or `https`.
    DisallowedScheme,
    /// The host points at a loopback or private network.
    DisallowedHost,
    /// DNS resolution failed for the destination.
    HostNotFound,
    /// The destination did not answer in time.
    Timeout,
    /// The destination answered 403.
    Forbidden,
    /// The destination answered 404.
    NotFound,
    /// The destination is not an HTML document.
    UnsupportedContentType,
    /// Anything not classified above.
    GenericFetchFailure,
}

impl FailureKind {
    /// Stable, user-readable message for this failure.
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingUrl => "URL is required",
            Self::InvalidUrl => "Invalid URL",
            Self::DisallowedScheme => "Invalid protocol",
            Self::DisallowedHost => "Host not allowed",
            Self::HostNotFound => "Website not found",
            Self::Timeout => "Request timeout",
            Self::Forbidden => "Access forbidden",
            Self::NotFound => "Page not found",
            Self::UnsupportedContentType => "Not an HTML page",
            Self::GenericFetchFailure => "Failed to load preview",
        }
    }

    /// Whether the failure is the caller's fault (HTTP 400) rather than the
    /// destination's (HTTP 500).
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            Self::MissingUrl | Self::InvalidUrl | Self::DisallowedScheme | Self::DisallowedHost
        )
    }
}

/// Rejection produced by the URL validator before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The string is not a URL (or not resolvable against the base).
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The scheme is anything but `http`/`https`.
    #[error("disallowed scheme: {0}")]
    DisallowedScheme(String),
}

impl ValidationError {
    /// The user-facing failure this rejection maps to.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidUrl(_) => FailureKind::InvalidUrl,
            Self::DisallowedScheme(_) => FailureKind::DisallowedScheme,
        }
    }
}
