// Data structures shared by the relay, the upstream client and the terminal client.
// Everything here is transient: an upload lives for exactly one request.

use axum::body::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest photo accepted for restoration.
pub const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Name of the multipart field carrying the photo, both on the relay and upstream.
pub const FILE_FIELD: &str = "file";

// Used when a multipart part carries no filename.
pub const FALLBACK_FILE_NAME: &str = "photo.jpg";

/// A photo received from the user, forwarded as-is to the restoration service.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Mime,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.type_() == mime::IMAGE
    }

    /// Filename offered for the restored result of this upload.
    pub fn restored_file_name(&self) -> String {
        restored_file_name(&self.file_name)
    }
}

pub fn restored_file_name(original: &str) -> String {
    format!("restored_{}", original)
}

/// A restored photo as returned by the restoration service.
#[derive(Debug, Clone)]
pub struct RestoredImage {
    pub file_name: String,
    pub content_type: Mime,
    pub data: Bytes,
}

/// Processing step selector understood by the restoration service's `/api/restore-step`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RestoreStep {
    Restoration,
    Colorization,
    Enhancement,
    #[default]
    All,
}

impl RestoreStep {
    pub fn as_str(self) -> &'static str {
        match self {
            RestoreStep::Restoration => "restoration",
            RestoreStep::Colorization => "colorization",
            RestoreStep::Enhancement => "enhancement",
            RestoreStep::All => "all",
        }
    }
}

impl fmt::Display for RestoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestoreStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restoration" => Ok(RestoreStep::Restoration),
            "colorization" => Ok(RestoreStep::Colorization),
            "enhancement" => Ok(RestoreStep::Enhancement),
            "all" => Ok(RestoreStep::All),
            other => Err(format!(
                "Unknown step '{}'. Expected one of: restoration, colorization, enhancement, all",
                other
            )),
        }
    }
}

/// Restoration preferences picked in the client.
/// These stay on the client: the relay only forwards the raw file.
#[derive(Serialize, Debug, Clone, PartialEq, clap::Args)]
pub struct ProcessingOptions {
    /// Skip damage and scratch removal.
    #[arg(long = "no-restoration", action = clap::ArgAction::SetFalse)]
    pub restoration: bool,

    /// Skip colorization of black-and-white photos.
    #[arg(long = "no-colorization", action = clap::ArgAction::SetFalse)]
    pub colorization: bool,

    /// Skip sharpening and contrast enhancement.
    #[arg(long = "no-enhancement", action = clap::ArgAction::SetFalse)]
    pub enhancement: bool,

    /// Request face enhancement.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub face_enhancement: bool,

    /// Upscale factor.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub upscale: u8,

    /// Balance between fidelity to the original (1.0) and quality (0.0).
    #[arg(long, default_value_t = 0.7)]
    pub fidelity: f32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            restoration: true,
            colorization: true,
            enhancement: true,
            face_enhancement: false,
            upscale: 2,
            fidelity: 0.7,
        }
    }
}

/// JSON error body produced by the relay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            message: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
