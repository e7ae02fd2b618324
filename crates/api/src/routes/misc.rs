//! Health and housekeeping endpoints.

use axum::response::Redirect;
use axum::Json;
use tablecat_domain::HealthCheck;

/// `GET /` — send browsers somewhere useful.
pub async fn home() -> Redirect {
    Redirect::temporary("/healthcheck")
}

/// `GET /healthcheck` and `GET /_/status`.
///
/// Container orchestration gates deployments on this endpoint answering
/// 200; it must stay dependency-free (no database round-trip).
pub async fn healthcheck() -> Json<HealthCheck> {
    Json(HealthCheck::default())
}
