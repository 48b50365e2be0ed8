//! API request handlers.

use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};

use crate::LecternError;
use crate::core::routing::JPEG_MIME_TYPE;
use crate::preprocess::split_data_url;
use crate::types::{ExtractionResult, ImagePayload, InputDocument, Origin};

use super::{
    error::ApiError,
    types::{ApiState, HealthResponse, OcrRequest, OcrResponse},
};

/// OCR relay handler.
///
/// POST /ocr
///
/// Accepts `{ "image": "<base64 or data URL>" }` and forwards it to the
/// upstream OCR service unchanged. Returns `{ "text": ... }`.
///
/// # Errors
///
/// - 400 `{ "error" }` when the body is not JSON or `image` is missing
/// - 500 `{ "error": "OCR failed", "details" }` when the upstream call fails
pub async fn ocr_handler(
    State(state): State<ApiState>,
    body: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::validation(LecternError::validation(e.body_text())))?;

    let image = request
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ApiError::validation(LecternError::validation("No image provided")))?;

    let (mime, data) = split_data_url(image.trim());
    let payload = ImagePayload::from_encoded(data, mime.unwrap_or(JPEG_MIME_TYPE));

    let text = state.ocr.recognize(&payload).await.map_err(ApiError::ocr_failed)?;
    Ok(Json(OcrResponse { text }))
}

/// Extract endpoint handler.
///
/// POST /extract
///
/// Accepts multipart form data with:
/// - `file`: the document; its file name selects the adapter
/// - `origin` (optional): `uploaded_file` (default), `camera_capture`, ...
///
/// Extraction failures are reported in the result's `status`, not as an
/// HTTP error.
pub async fn extract_handler(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionResult>, ApiError> {
    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut origin = Origin::UploadedFile;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(LecternError::validation(e.to_string())))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(LecternError::validation(e.to_string())))?;

                file = Some((data.to_vec(), file_name, content_type));
            }
            "origin" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(LecternError::validation(e.to_string())))?;
                origin = value.parse().map_err(ApiError::validation)?;
            }
            _ => {}
        }
    }

    let (content, file_name, content_type) =
        file.ok_or_else(|| ApiError::validation(LecternError::validation("No file provided for extraction")))?;

    let mut document = InputDocument::new(origin, content);
    document.file_name = file_name.filter(|name| !name.is_empty());
    document.mime_type = content_type;

    Ok(Json(state.orchestrator.extract(document).await))
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
