//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};

/// Classify request
#[derive(Debug, Default, Deserialize)]
pub struct ClassifyRequest {
    /// Data URL or bare base64
    #[serde(default)]
    pub image: Option<String>,
}

/// Map query (`/api/complaints-map?lat=..&lon=..&radius=..`)
#[derive(Debug, Default, Deserialize)]
pub struct MapQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
}

/// Service index
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// API root
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_path: String,
    pub model_loaded: bool,
    pub storage: String,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
