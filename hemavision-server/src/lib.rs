use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use hemavision_core::Pipeline;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod routes;
pub mod upload;

use upload::UploadStore;

/// Shared, read-only after startup.
#[derive(Debug)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub uploads: UploadStore,
}

pub fn app(state: AppState, max_file_size: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/predict", post(routes::predict))
        .route("/info/:cell_type", get(routes::cell_info))
        .route("/health", get(routes::health))
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(routes::panic_response))
        .with_state(Arc::new(state))
}
