use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::analytics::PriceSummary;
use crate::export::{self, CSV_FILE_NAME};
use crate::models::{SessionStatus, Snapshot};
use crate::sink::PublishSink;
use super::{AppState, ApiResponse, HealthResponse, StartResponse, WebError};

const DASHBOARD_TEMPLATE: &str = include_str!("../../templates/dashboard.html");

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub url: String,
    #[serde(default)]
    pub keywords: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.session.state()))
}

/// GET / - dashboard page
pub async fn dashboard_page(State(state): State<AppState>) -> Html<String> {
    Html(DASHBOARD_TEMPLATE.replace(
        "{{poll_interval_ms}}",
        &state.config.dashboard.poll_interval_ms.to_string(),
    ))
}

/// POST /api/v1/session/start
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StartResponse>>), WebError> {
    if request.url.trim().is_empty() {
        return Err(WebError::bad_request("A storefront URL is required"));
    }

    let sink: Arc<dyn PublishSink> = Arc::new(state.sink.clone());
    let started = state
        .session
        .start(&request.url, request.keywords.as_deref(), sink)?;

    let status = if started {
        tracing::info!(url = %request.url, keywords = ?request.keywords, "Session started via API");
        StatusCode::ACCEPTED
    } else {
        tracing::debug!(url = %request.url, "Start ignored, session already running");
        StatusCode::OK
    };

    Ok((
        status,
        Json(ApiResponse::success(StartResponse {
            started,
            status: state.session.status(),
        })),
    ))
}

/// POST /api/v1/session/stop
pub async fn stop_session(State(state): State<AppState>) -> Json<ApiResponse<SessionStatus>> {
    state.session.stop();
    Json(ApiResponse::success(state.session.status()))
}

/// GET /api/v1/session/status
pub async fn session_status(State(state): State<AppState>) -> Json<ApiResponse<SessionStatus>> {
    let mut status = state.session.status();
    // Report what readers can actually see.
    status.item_count = state.sink.len();
    Json(ApiResponse::success(status))
}

/// GET /api/v1/items
pub async fn list_items(State(state): State<AppState>) -> Json<ApiResponse<Snapshot>> {
    let snapshot = state.sink.read_latest();
    let meta = serde_json::json!({ "count": snapshot.len() });
    Json(ApiResponse::success_with_meta(snapshot, meta))
}

/// GET /api/v1/items/export.csv
pub async fn export_csv(State(state): State<AppState>) -> Result<Response, WebError> {
    let snapshot = state.sink.read_latest();
    if snapshot.is_empty() {
        return Err(WebError::not_found("No data available to download"));
    }

    let body = export::to_csv_string(&snapshot)?;
    tracing::info!(rows = snapshot.len(), "CSV export requested");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", CSV_FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}

/// GET /api/v1/analytics
pub async fn price_analytics(State(state): State<AppState>) -> Json<ApiResponse<PriceSummary>> {
    let snapshot = state.sink.read_latest();
    match PriceSummary::from_items(&snapshot) {
        Some(summary) => Json(ApiResponse::success(summary)),
        None => Json(ApiResponse::empty("No price data available for analytics")),
    }
}
