//! Route definitions for the preview service.
//!
//! ## Routes
//!
//! - `GET /health` - Health check (JSON)
//! - `POST /api/preview` - Fetch and sanitize a page (JSON)

mod health;
mod preview;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the complete preview service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/preview", post(preview::preview_handler))
        .with_state(state)
}
