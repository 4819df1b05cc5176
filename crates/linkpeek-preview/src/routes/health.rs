//! Health check endpoint.

use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

impl HealthResponse {
    fn at(now: DateTime<Utc>) -> Self {
        Self {
            status: "OK",
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Public health check endpoint.
///
/// Returns basic service health for load balancer probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::at(Utc::now()))
}
