//! HTTP error mapping.

use crate::pipeline::SubmitError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures surfaced to HTTP clients as a status code and a plain-text body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("missing required headers")]
    MissingHeaders,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("failed to read body")]
    UnreadableBody,

    #[error("chunk not found")]
    NotFound,

    #[error("backpressure: queue full")]
    Backpressure,

    #[error("pipeline closed")]
    Closed,

    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeaders | Self::InvalidTimestamp => StatusCode::BAD_REQUEST,
            Self::UnreadableBody => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Backpressure => StatusCode::TOO_MANY_REQUESTS,
            Self::Closed => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Backpressure => Self::Backpressure,
            SubmitError::Closed => Self::Closed,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
