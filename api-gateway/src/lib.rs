// ==============================================================================
// lib.rs - Variant API Gateway Library
// ==============================================================================
// Description: Router construction and shared state for the HTTP API
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod handlers;
pub mod models;
pub mod state;
pub mod validator;

pub use config::GatewayConfig;
pub use state::AppState;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full router: API routes under /api/v1 plus tracing, CORS and
/// the body limit
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/upload", post(handlers::upload_vcf))
        .route("/variants", get(handlers::list_variants))
        .route("/variants/{variant_id}", get(handlers::get_variant))
        .route(
            "/variants/{variant_id}/annotations",
            get(handlers::get_variant_annotations),
        )
        .route("/stats", get(handlers::get_stats))
        .route("/status", get(handlers::get_status))
        .route("/jobs/{job_id}", get(handlers::get_job_status));

    let allowed_origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_credentials(false)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = state.max_upload_size().saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/v1/", get(handlers::root))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
