//! HTTP request gateway.
//!
//! Routes, body limits and middleware for the bridge API. Handlers live in
//! [`handlers`]; request parsing in [`requests`]; response shapes in [`envelope`].

pub mod envelope;
pub mod handlers;
pub mod requests;
pub mod state;

pub use state::Settings;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the application router.
pub fn router(settings: Arc<Settings>) -> Router {
    let cors = cors_layer(&settings.cors_origins);
    let upload_limit = settings.upload_limit_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/get_tables", post(handlers::get_tables))
        .route("/api/get_columns", post(handlers::get_columns))
        .route("/api/preview_data", post(handlers::preview_data))
        .route(
            "/api/ingest_clickhouse_to_flatfile",
            post(handlers::ingest_clickhouse_to_flatfile),
        )
        .route(
            "/api/ingest_flatfile_to_clickhouse",
            post(handlers::ingest_flatfile_to_clickhouse)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/join_tables", post(handlers::join_tables))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(settings)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE]);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}
