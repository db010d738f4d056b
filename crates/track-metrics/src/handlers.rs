//! HTTP request handlers.

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{ContentType, HeaderMapExt, Mime};
use bytes::Bytes;

use crate::{
    encoding,
    errors::AppError,
    file_parsers::FileType,
    pipeline::process_bytes,
    series::{Track, TrackSummary},
};

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Runs an uploaded track file through the pipeline and returns the
/// split-orientation table.
pub async fn process_track(headers: HeaderMap, body: Bytes) -> Result<Response, AppError> {
    let track = run_pipeline(&headers, body).await?;
    let json = encoding::to_split_json(&track)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

pub async fn track_summary(
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TrackSummary>, AppError> {
    let track = run_pipeline(&headers, body).await?;
    Ok(Json(track.summary()))
}

async fn run_pipeline(headers: &HeaderMap, body: Bytes) -> Result<Track, AppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    }

    let file_type = headers
        .typed_get::<ContentType>()
        .map_or(FileType::Other, |ct| FileType::from(Mime::from(ct)));

    tracing::info!(?file_type, bytes = body.len(), "processing track upload");

    let track = tokio::task::spawn_blocking(move || process_bytes(file_type, body))
        .await
        .map_err(|e| {
            tracing::error!("Pipeline task failed: {e}");
            AppError::Internal
        })??;

    tracing::info!(samples = track.len(), "track processed");

    Ok(track)
}
