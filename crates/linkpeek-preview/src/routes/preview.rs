//! `POST /api/preview` handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use linkpeek_core::{PreviewPage, PreviewRequest};

use crate::error::PreviewError;
use crate::state::AppState;

/// Fetch, sanitize and return a preview of the requested URL.
///
/// A body that is not valid JSON, or whose `url` is not a string, is treated
/// the same as a body without `url`.
pub async fn preview_handler(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewPage>, PreviewError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable preview request body");
            PreviewRequest::default()
        }
    };

    let page = state.service.get_preview(request.url.as_deref()).await?;
    Ok(Json(page))
}
