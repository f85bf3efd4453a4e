use super::{MULTIPART_OVERHEAD_BYTES, SharedRestorationClient, handlers};
use crate::models::MAX_UPLOAD_SIZE_BYTES;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_app(upstream: SharedRestorationClient) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/restore", post(handlers::restore))
        .route("/api/restore-step", post(handlers::restore_step))
        // Cap request bodies slightly above the largest accepted photo
        .layer(DefaultBodyLimit::max(
            MAX_UPLOAD_SIZE_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(upstream)
}
