use crate::core::config::GatewayConfig;
use crate::ocr::OcrGateway;
use crate::types::ImagePayload;
use crate::{LecternError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelayResponse {
    Error {
        error: String,
        #[serde(default)]
        details: Option<String>,
    },
    Text {
        text: String,
    },
}

/// Client for the OCR relay.
///
/// The underlying `reqwest::Client` is built on first use and reused for
/// every later call, including concurrent ones.
pub struct HttpOcrGateway {
    endpoint: String,
    timeout: Duration,
    client: OnceCell<reqwest::Client>,
}

impl HttpOcrGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: OnceCell::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!(endpoint = %self.endpoint, timeout_ms = self.timeout.as_millis() as u64, "Creating OCR HTTP client");
                reqwest::Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| LecternError::gateway_with_source("Failed to create HTTP client", e))
            })
            .await
    }
}

fn error_message(error: String, details: Option<String>) -> String {
    match details {
        Some(details) => format!("{} ({})", error, details),
        None => error,
    }
}

#[async_trait]
impl OcrGateway for HttpOcrGateway {
    fn name(&self) -> &str {
        "http-relay"
    }

    async fn recognize(&self, payload: &ImagePayload) -> Result<String> {
        let client = self.client().await?;
        let image = payload.data_url();

        let response = client
            .post(&self.endpoint)
            .json(&RelayRequest { image: &image })
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<RelayResponse>(&body);

        if !status.is_success() {
            return Err(match parsed {
                Ok(RelayResponse::Error { error, details }) => LecternError::gateway(format!(
                    "OCR relay returned status {}: {}",
                    status,
                    error_message(error, details)
                )),
                _ => LecternError::gateway(format!("OCR relay returned status: {}", status)),
            });
        }

        match parsed {
            Ok(RelayResponse::Text { text }) => Ok(text),
            Ok(RelayResponse::Error { error, details }) => Err(LecternError::gateway(format!(
                "OCR relay returned an error: {}",
                error_message(error, details)
            ))),
            Err(e) => Err(LecternError::gateway_with_source("Failed to parse OCR relay response", e)),
        }
    }
}
