// Client for the external restoration service.
// Re-wraps an upload as multipart, posts it upstream and classifies failures.

use crate::models::{FILE_FIELD, RestoreStep, RestoredImage, UploadedFile};
use axum::http::{StatusCode, header};
use mime::Mime;
use reqwest::multipart::{Form, Part};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Default time to wait for the restoration service before giving up.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum UpstreamError {
    /// No response within the configured timeout.
    Timeout,
    /// The service could not be reached (connection refused, DNS failure, ...).
    Unavailable(String),
    /// The service answered with a non-success status.
    Rejected { status: StatusCode, details: String },
    Other(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Timeout => write!(f, "restoration service timed out"),
            UpstreamError::Unavailable(reason) => {
                write!(f, "restoration service unavailable: {}", reason)
            }
            UpstreamError::Rejected { status, details } => {
                write!(f, "restoration service returned {}: {}", status, details)
            }
            UpstreamError::Other(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // Timeout first: a connect that times out is still a timeout.
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Unavailable(err.to_string())
        } else {
            UpstreamError::Other(err.to_string())
        }
    }
}

pub struct RestorationClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RestorationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the full restoration pipeline on `file`.
    pub async fn restore(&self, file: &UploadedFile) -> Result<RestoredImage, UpstreamError> {
        let url = format!("{}/api/restore", self.base_url);
        self.post_file(&url, file).await
    }

    /// Runs a single step of the pipeline on `file`.
    pub async fn restore_step(
        &self,
        file: &UploadedFile,
        step: RestoreStep,
    ) -> Result<RestoredImage, UpstreamError> {
        let url = format!("{}/api/restore-step?step={}", self.base_url, step.as_str());
        self.post_file(&url, file).await
    }

    async fn post_file(
        &self,
        url: &str,
        file: &UploadedFile,
    ) -> Result<RestoredImage, UpstreamError> {
        let part = Part::stream_with_length(file.data.clone(), file.len() as u64)
            .file_name(file.file_name.clone())
            .mime_str(file.content_type.as_ref())
            .map_err(|e| UpstreamError::Other(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!("Forwarding {} ({} bytes) to {}", file.file_name, file.len(), url);

        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let details = match response.text().await {
                Ok(text) if !text.trim().is_empty() => text,
                _ => status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            };
            return Err(UpstreamError::Rejected { status, details });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Mime>().ok())
            .filter(|m| m.type_() == mime::IMAGE)
            .unwrap_or(mime::IMAGE_JPEG);

        let data = response.bytes().await?;

        info!(
            "Restoration service returned {} bytes ({}) for {}",
            data.len(),
            content_type,
            file.file_name
        );

        Ok(RestoredImage {
            file_name: file.restored_file_name(),
            content_type,
            data,
        })
    }
}
