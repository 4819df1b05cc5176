//! Error types for the preview service.
//!
//! Errors are rendered as `{ "error": "<message>" }` JSON bodies. Only the
//! stable message of the matching [`FailureKind`] is sent; the underlying
//! detail is logged and stays on the server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkpeek_core::{FailureKind, PreviewFailure, ValidationError};

use crate::fetch::FetchError;

/// Preview service error type.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// The request body carried no usable `url`.
    #[error("url is required")]
    MissingUrl,

    /// The URL failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The URL points at a loopback or private-network host.
    #[error("host not allowed: {0}")]
    DisallowedHost(String),

    /// The destination could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl PreviewError {
    /// The user-facing failure this error maps to.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingUrl => FailureKind::MissingUrl,
            Self::Validation(err) => err.kind(),
            Self::DisallowedHost(_) => FailureKind::DisallowedHost,
            Self::Fetch(err) => err.kind(),
        }
    }

    /// HTTP status sent for this error.
    pub fn status(&self) -> StatusCode {
        if self.kind().is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = ?kind, "preview failed");
        } else {
            tracing::warn!(error = %self, kind = ?kind, "preview request rejected");
        }

        (status, Json(PreviewFailure::from(kind))).into_response()
    }
}
