//! Router assembly.

pub mod demo;
pub mod misc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let demo = Router::new()
        .route("/demo/name/", get(demo::list_tables))
        .route("/demo/date/", get(demo::get_date))
        .route("/demo/error/", get(demo::get_error))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .nest("/api/v1", demo)
        .route("/", get(misc::home))
        .route("/healthcheck", get(misc::healthcheck))
        .route("/_/status", get(misc::healthcheck))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
