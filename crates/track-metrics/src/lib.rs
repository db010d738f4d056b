//! GPS track metric pipeline.
//!
//! Turns a recorded track (tracks → segments → timestamped fixes) into a
//! single motion series: per-sample elapsed time, altitude-adjusted
//! great-circle distance, speed and cumulative distance.
//!
//! Stages, in order: [`collector`] flattens and normalises fixes,
//! [`metrics`] pairs each fix with its predecessor using [`geodesic`]
//! distances, and [`series`] exposes the result keyed by timestamp.
//! [`pipeline`] wires them together and [`encoding`] renders the columnar
//! JSON table handed to visualisation clients.

pub mod collector;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod file_parsers;
pub mod geodesic;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod series;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::{
    config::ServerConfig,
    handlers::{health_check, process_track, track_summary},
};

pub use crate::{
    errors::PipelineError,
    models::{DerivedSample, ParsedFile, RawFix, TrackPointData},
    pipeline::{process_batch, process_bytes, process_fixes, process_parsed},
    series::{Track, TrackSummary},
};

pub fn create_router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/tracks", post(process_track))
        .route("/tracks/summary", post(track_summary))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(&config);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;

    tracing::info!("Server running on http://{}", config.listen_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
