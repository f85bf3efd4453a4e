// Error types for the relay and their JSON rendering

use crate::models::ErrorBody;
use crate::upstream::UpstreamError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Relay error types
#[derive(Debug)]
pub enum ApiError {
    /// The request carried no usable `file` field.
    MissingFile,
    BadRequest(String),
    InvalidMultipart(String),
    PayloadTooLarge(String),

    // Outcomes of the upstream call
    UpstreamRejected { status: StatusCode, details: String },
    UpstreamUnavailable,
    UpstreamTimeout,
    InternalServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::BadRequest(_) | Self::InvalidMultipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamRejected { status, .. } => *status,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorBody {
        match self {
            Self::MissingFile => ErrorBody::new("No file uploaded"),
            Self::BadRequest(msg) => ErrorBody::new(msg),
            Self::InvalidMultipart(details) => {
                ErrorBody::new("Invalid multipart request").with_details(details)
            }
            Self::PayloadTooLarge(details) => ErrorBody::new("File too large").with_details(details),
            Self::UpstreamRejected { details, .. } => {
                ErrorBody::new("Photo processing failed").with_details(details)
            }
            Self::UpstreamUnavailable => ErrorBody::new(
                "AI service unavailable - please ensure the restoration API is running",
            ),
            Self::UpstreamTimeout => ErrorBody::new("Processing timeout - image may be too large"),
            Self::InternalServerError(msg) => {
                ErrorBody::new("Failed to process image").with_message(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(error: UpstreamError) -> Self {
        match error {
            UpstreamError::Timeout => Self::UpstreamTimeout,
            // The reason is logged by the handler; the user only sees the status.
            UpstreamError::Unavailable(_) => Self::UpstreamUnavailable,
            UpstreamError::Rejected { status, details } => {
                Self::UpstreamRejected { status, details }
            }
            UpstreamError::Other(reason) => Self::InternalServerError(reason),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(error.body_text())
        } else {
            Self::InvalidMultipart(error.body_text())
        }
    }
}
