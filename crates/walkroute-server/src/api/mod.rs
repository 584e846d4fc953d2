//! API routes for the walkroute server.

pub mod routesets;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/routesets", post(routesets::create_routeset))
        .route("/v1/slopes/colors", post(routesets::classify_slopes))
        .route("/v1/color-policy", get(routesets::get_color_policy))
}
