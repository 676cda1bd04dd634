use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::AppConfig;
use crate::session::ScrapeSession;
use crate::sink::LatestSnapshot;

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{
    dashboard_page, export_csv, health_check, list_items, price_analytics, session_status,
    start_session, stop_session, StartRequest,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ScrapeSession>,
    pub sink: LatestSnapshot,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(session: Arc<ScrapeSession>, config: AppConfig) -> Self {
        Self {
            session,
            sink: LatestSnapshot::new(),
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(dashboard_page))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/session/status", get(session_status))
        .route("/items", get(list_items))
        .route("/items/export.csv", get(export_csv))
        .route("/analytics", get(price_analytics))
        .layer(axum::middleware::from_fn(middleware::no_store))
}

pub async fn serve(config: AppConfig, state: AppState) -> anyhow::Result<()> {
    let session = Arc::clone(&state.session);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await?;

    tracing::info!(
        "Dashboard available at http://{}:{}",
        config.server.host,
        config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            session.stop();
            session.wait_until_stopped().await;
        })
        .await?;

    Ok(())
}
