//! Source adapters.
//!
//! Each adapter turns the bytes of one [`DocumentFormat`] into plain text.
//! Adapters report their own failures as [`LecternError`](crate::LecternError);
//! the orchestrator converts those into `failed` results.

pub mod image;
pub mod pdf;
pub mod text;
pub mod word;

pub use image::ImageAdapter;
pub use pdf::PdfAdapter;
pub use text::PlainTextAdapter;
pub use word::WordAdapter;

use crate::Result;
use crate::types::{DocumentFormat, ExtractionResult, InputDocument};
use async_trait::async_trait;

/// Converts one input document to text.
///
/// Adapters must be thread-safe (`Send + Sync`); the orchestrator shares a
/// single instance of each across concurrent calls.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name, used in logs.
    fn name(&self) -> &str;

    /// The format this adapter handles.
    fn format(&self) -> DocumentFormat;

    /// Extract text from `document`.
    ///
    /// Called only with non-empty content. The returned result's `format`
    /// is overwritten by the orchestrator with the routed format.
    ///
    /// # Errors
    ///
    /// - `LecternError::Parsing` - the content could not be read as this format
    /// - `LecternError::Gateway` - OCR failed (image adapter only)
    async fn extract(&self, document: InputDocument) -> Result<ExtractionResult>;
}
