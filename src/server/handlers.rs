// Request handlers for the local API

use crate::services::{
    reconnect_report, reconnect_view, status_report, Registry, ServiceId, StatusReport,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Shown in the dashboard header
    pub remote_host: String,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, remote_host: impl Into<String>) -> Self {
        Self {
            registry,
            remote_host: remote_host.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn not_found(error: impl ToString) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// GET /
pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(DASHBOARD_HTML.replace("{{REMOTE_HOST}}", &escape_html(&state.remote_host)))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    let results = state.registry.status_all().await;
    Json(status_report(results, |id| state.registry.is_busy(id)))
}

/// POST /api/reconnect/:id
///
/// `all` reconnects every service and returns a map keyed by id. A single
/// reconnect answers 409 when that service is already being repaired.
pub async fn post_reconnect(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if id.eq_ignore_ascii_case("all") {
        let results = state.registry.reconnect_all().await;
        return Json(reconnect_report(&results)).into_response();
    }

    let service: ServiceId = match id.parse() {
        Ok(service) => service,
        Err(e) => {
            tracing::debug!("Rejected reconnect request: {}", e);
            return not_found(e);
        }
    };

    match state.registry.reconnect(service).await {
        Ok(result) => {
            let status = if result.is_in_progress() {
                StatusCode::CONFLICT
            } else {
                StatusCode::OK
            };
            (status, Json(reconnect_view(&result))).into_response()
        }
        Err(e) => not_found(e),
    }
}
