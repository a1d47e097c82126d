// Route table for the dashboard and JSON API
//
// - GET  /                    embedded HTML dashboard
// - GET  /api/status          health of every service
// - POST /api/reconnect/:id   repair one service, or `all`

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/status", get(handlers::get_status))
        .route("/api/reconnect/:id", post(handlers::post_reconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
