//! HTTP relay for the Lectern pipeline.
//!
//! An Axum router that lets browser clients reach the OCR service without
//! holding its API key, and exposes the extraction pipeline over HTTP.
//!
//! # Endpoints
//!
//! - `POST /ocr` - `{ "image": "<base64 or data URL>" }` → `{ "text" }`
//! - `POST /extract` - multipart `file` → `ExtractionResult`
//! - `GET /health` - health check
//!
//! # Examples
//!
//! ```no_run
//! use lectern::{LecternConfig, api::serve};
//!
//! #[tokio::main]
//! async fn main() -> lectern::Result<()> {
//!     let mut config = LecternConfig::default();
//!     config.apply_env_overrides()?;
//!     serve(config).await
//! }
//! ```
//!
//! ```bash
//! curl -X POST -H 'Content-Type: application/json' \
//!      -d '{"image": "data:image/jpeg;base64,..."}' http://localhost:6969/ocr
//! curl -F "file=@scan.pdf" http://localhost:6969/extract
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::ApiError;
pub use server::{ENV_CORS_ORIGINS, cors_layer, create_router, create_router_with_state, serve, serve_on, state_from_config};
pub use types::{ApiState, ErrorResponse, HealthResponse, OcrRequest, OcrResponse};
