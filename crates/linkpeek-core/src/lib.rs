//! Core types and validation shared by the linkpeek preview service and the
//! hover client.
//!
//! This crate provides:
//! - The wire types of `POST /api/preview` ([`PreviewRequest`], [`PreviewResult`])
//! - The failure taxonomy and its stable user-facing messages ([`FailureKind`])
//! - URL validation for service input and the client-side link filter

mod error;
mod types;
pub mod validate;

// ═══════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════

/// Title used when a page has neither a `<title>` nor an `<h1>`.
pub const UNTITLED_PAGE: &str = "Untitled Page";

pub use error::{FailureKind, ValidationError};
pub use types::{PreviewFailure, PreviewPage, PreviewRequest, PreviewResult};
pub use validate::{LinkFilter, is_private_host, resolve_href, validate_preview_url};
