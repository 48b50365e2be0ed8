//! Plain text adapter. Also serves as the fallback for unrecognized suffixes.

use crate::Result;
use crate::adapters::SourceAdapter;
use crate::types::{DocumentFormat, ExtractionResult, InputDocument};
use async_trait::async_trait;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD.
/// A leading byte-order mark is dropped.
pub fn decode_text(content: &[u8]) -> String {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    String::from_utf8_lossy(content).into_owned()
}

/// Plain text adapter.
///
/// Never fails.
pub struct PlainTextAdapter {
    format: DocumentFormat,
}

impl PlainTextAdapter {
    pub fn new() -> Self {
        Self {
            format: DocumentFormat::PlainText,
        }
    }

    /// The same decoding, registered for unrecognized suffixes.
    pub fn fallback() -> Self {
        Self {
            format: DocumentFormat::Fallback,
        }
    }
}

impl Default for PlainTextAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for PlainTextAdapter {
    fn name(&self) -> &str {
        match self.format {
            DocumentFormat::Fallback => "fallback-text-adapter",
            _ => "plain-text-adapter",
        }
    }

    fn format(&self) -> DocumentFormat {
        self.format
    }

    async fn extract(&self, document: InputDocument) -> Result<ExtractionResult> {
        Ok(ExtractionResult::success(self.format, decode_text(&document.content)))
    }
}
