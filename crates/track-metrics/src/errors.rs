use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::file_parsers::ParseError;

/// Why a single fix was rejected during collection.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FixDefect {
    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("missing elevation")]
    MissingElevation,

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("elevation {0} m is at or below the centre of the Earth")]
    ElevationBelowCentre(f64),

    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("malformed fix #{index} (track {track}, segment {segment}, point {point}): {defect}")]
    MalformedInput {
        /// Position in the flattened fix sequence.
        index: usize,
        track: usize,
        segment: usize,
        point: usize,
        defect: FixDefect,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Encoding(e.to_string())
    }
}

/// Errors surfaced by the HTTP shell.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Pipeline(PipelineError::Encoding(msg)) => {
                error!("Encoding error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Pipeline(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
