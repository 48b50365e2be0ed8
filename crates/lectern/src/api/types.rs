//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{LecternConfig, Orchestrator};
use crate::ocr::OcrGateway;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<LecternConfig>,
    /// Serves `POST /extract`.
    pub orchestrator: Orchestrator,
    /// Upstream OCR service behind `POST /ocr`.
    pub ocr: Arc<dyn OcrGateway>,
}

/// `POST /ocr` request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrRequest {
    /// Base64 image, with or without a `data:` URL prefix.
    #[serde(default)]
    pub image: Option<String>,
}

/// `POST /ocr` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status
    pub status: String,
    /// API version
    pub version: String,
}

/// Error body returned by every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
