// Request and response shapes specific to the relay's HTTP API

use serde::{Deserialize, Serialize};

/// Body of `GET /api/health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Query parameters of `POST /api/restore-step`.
/// The step stays a raw string so an unknown value can be reported as JSON.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RestoreStepQuery {
    pub step: Option<String>,
}
