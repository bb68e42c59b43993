use crate::dashboard::{Dashboard, DashboardRequest, DashboardView};
use crate::data::LoadReport;
use crate::render::site_layer;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

pub struct AppState {
    pub dashboard: Dashboard,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/dashboard", post(dashboard_handler))
        .route("/api/export", post(export_handler))
        .route("/api/sites", get(sites_handler))
        .route("/api/health", get(health_handler));

    if let Some(dir) = &state.dashboard.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn start_server(dashboard: Dashboard) -> Result<()> {
    let port = dashboard.config.server.port;
    let state = Arc::new(AppState { dashboard });
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DashboardRequest>,
) -> Json<DashboardView> {
    Json(state.dashboard.pass(&request))
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DashboardRequest>,
) -> Response {
    match state.dashboard.export_csv(&request) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"filtered_places.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("CSV export failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}

async fn sites_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(site_layer(&state.dashboard.dataset.sites))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<LoadReport> {
    Json(state.dashboard.dataset.report.clone())
}
