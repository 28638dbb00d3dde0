//! Router assembly and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/state", get(handlers::state_handler))
        .route("/command", post(handlers::command_handler))
        .route("/key/:key", post(handlers::key_handler))
        .route("/view.png", get(handlers::view_handler))
        .route("/overlay", get(handlers::overlay_handler))
        .route("/overlay/bounds", get(handlers::overlay_bounds_handler))
        .route(
            "/locations",
            get(handlers::locations_handler).post(handlers::add_location_handler),
        )
        .route("/locations/:id", delete(handlers::remove_location_handler))
        .route(
            "/locations/:id/visibility",
            post(handlers::location_visibility_handler),
        )
        .route("/health", get(handlers::health_handler));

    if let Some(handle) = prometheus {
        app = app
            .route("/metrics", get(handlers::metrics_handler))
            .layer(Extension(handle));
    }

    app.layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

pub async fn run_server(
    state: Arc<AppState>,
    addr: SocketAddr,
    prometheus: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let session = Arc::clone(&state.session);
    let app = create_router(state, prometheus);

    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    session.stop_playback().await;
    Ok(())
}
