use crate::core::config::OcrSpaceConfig;
use crate::core::routing::JPEG_MIME_TYPE;
use crate::ocr::OcrGateway;
use crate::preprocess::split_data_url;
use crate::types::ImagePayload;
use crate::{LecternError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Response body of `POST /parse/image`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrSpaceResponse {
    #[serde(default)]
    pub is_errored_on_processing: bool,

    /// A string or a list of strings, depending on the failure.
    #[serde(default)]
    pub error_message: Option<serde_json::Value>,

    #[serde(default)]
    pub parsed_results: Vec<ParsedResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParsedResult {
    #[serde(default)]
    pub parsed_text: String,
}

impl OcrSpaceResponse {
    /// Recognized text: every non-empty `ParsedText` joined with `\n`, trimmed.
    pub fn into_text(self) -> Result<String> {
        if self.is_errored_on_processing {
            let message = match self.error_message {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => "OCR processing failed".to_string(),
            };
            return Err(LecternError::gateway(format!("OCR.space: {}", message)));
        }

        let text = self
            .parsed_results
            .iter()
            .map(|r| r.parsed_text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text.trim().to_string())
    }
}

/// Client for the OCR.space parse endpoint.
pub struct OcrSpaceClient {
    config: OcrSpaceConfig,
    client: OnceCell<reqwest::Client>,
}

impl OcrSpaceClient {
    pub fn new(config: OcrSpaceConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &OcrSpaceConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LecternError::MissingDependency("OCR.space API key (set OCR_API_KEY)".to_string()))
    }

    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(self.config.timeout_secs))
                    .build()
                    .map_err(|e| LecternError::gateway_with_source("Failed to create HTTP client", e))
            })
            .await
    }

    /// Recognize an image given as bare base64 or a `data:` URL.
    pub async fn recognize_base64(&self, image: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let (mime, data) = split_data_url(image.trim());
        let base64_image = format!("data:{};base64,{}", mime.unwrap_or(JPEG_MIME_TYPE), data);
        let overlay = if self.config.overlay { "true" } else { "false" };

        let client = self.client().await?;
        tracing::debug!(endpoint = %self.config.endpoint, language = %self.config.language, "Sending image to OCR.space");

        let response = client
            .post(&self.config.endpoint)
            .form(&[
                ("apikey", api_key),
                ("language", self.config.language.as_str()),
                ("isOverlayRequired", overlay),
                ("base64Image", base64_image.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LecternError::gateway(format!(
                "OCR.space returned status: {}",
                response.status()
            )));
        }

        let body: OcrSpaceResponse = response
            .json()
            .await
            .map_err(|e| LecternError::gateway_with_source("Failed to parse OCR.space response", e))?;

        body.into_text()
    }
}

#[async_trait]
impl OcrGateway for OcrSpaceClient {
    fn name(&self) -> &str {
        "ocr-space"
    }

    async fn recognize(&self, payload: &ImagePayload) -> Result<String> {
        self.recognize_base64(&payload.data_url()).await
    }
}
