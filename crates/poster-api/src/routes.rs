//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    generate_meme, generate_template_background, health, list_templates, upload_template_image,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let poster_routes = Router::new()
        .route("/templates", get(list_templates))
        .route("/generate-meme", post(generate_meme));

    let admin_routes = Router::new()
        .route("/admin/upload-template-image", post(upload_template_image))
        .route("/admin/generate-template-background", post(generate_template_background));

    let health_routes = Router::new()
        .route("/", get(health))
        .route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .merge(poster_routes)
        .merge(admin_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest_service("/uploads", uploads)
        // Multipart uploads are bounded by the body limit below instead of axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
