//! Wire types for `POST /api/preview`.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Request body: `{ "url": "https://..." }`.
///
/// `url` is optional at the type level so that a missing field surfaces as a
/// `MissingUrl` failure instead of a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl PreviewRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// A successfully sanitized page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPage {
    /// Always `true`; kept on the wire for clients that branch on it.
    pub success: bool,
    /// Sanitized, self-contained HTML document.
    pub html: String,
    /// Display title of the page.
    pub title: String,
    /// The URL that was previewed.
    pub url: String,
}

impl PreviewPage {
    pub fn new(html: String, title: String, url: String) -> Self {
        Self {
            success: true,
            html,
            title,
            url,
        }
    }
}

/// Failure body: `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewFailure {
    pub error: String,
}

impl From<FailureKind> for PreviewFailure {
    fn from(kind: FailureKind) -> Self {
        Self {
            error: kind.message().to_string(),
        }
    }
}

/// Outcome of one preview request, exactly as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviewResult {
    Page(PreviewPage),
    Failed(PreviewFailure),
}

impl PreviewResult {
    pub fn failed(kind: FailureKind) -> Self {
        Self::Failed(kind.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}
