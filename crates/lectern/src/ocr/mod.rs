//! OCR gateway boundary.
//!
//! Character recognition itself happens in an external service. This module
//! defines the seam the pipeline calls through and two clients for it:
//!
//! - [`HttpOcrGateway`] posts the preprocessed image to the relay server
//!   (`POST {"image": <data URL>}` → `{"text"}` or `{"error"}`)
//! - [`OcrSpaceClient`] calls OCR.space directly; the relay server uses it
//!   upstream, and the pipeline can use it when no relay is deployed

mod http;
mod ocr_space;

pub use http::HttpOcrGateway;
pub use ocr_space::{OcrSpaceClient, OcrSpaceResponse, ParsedResult};

use crate::Result;
use crate::types::ImagePayload;
use async_trait::async_trait;

/// Recognizes text in an image through an external service.
///
/// Implementations must be thread-safe (`Send + Sync`) and apply a bounded
/// timeout to every request.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use lectern::ocr::OcrGateway;
/// use lectern::types::ImagePayload;
/// use lectern::Result;
///
/// struct Echo;
///
/// #[async_trait]
/// impl OcrGateway for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn recognize(&self, payload: &ImagePayload) -> Result<String> {
///         Ok(format!("{}x{}", payload.width, payload.height))
///     }
/// }
/// ```
#[async_trait]
pub trait OcrGateway: Send + Sync {
    /// Gateway name, used in logs.
    fn name(&self) -> &str;

    /// Return the text recognized in `payload`.
    ///
    /// # Errors
    ///
    /// - `LecternError::Gateway` - transport failure, timeout, non-success
    ///   status, or an error reported by the service
    /// - `LecternError::MissingDependency` - the client is not configured
    async fn recognize(&self, payload: &ImagePayload) -> Result<String>;
}
