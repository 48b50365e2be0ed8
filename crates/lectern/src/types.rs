use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Where an input document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    TypedText,
    UploadedFile,
    CameraCapture,
    ClipboardPaste,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::TypedText => "typed_text",
            Origin::UploadedFile => "uploaded_file",
            Origin::CameraCapture => "camera_capture",
            Origin::ClipboardPaste => "clipboard_paste",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Origin {
    type Err = crate::LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "typed_text" | "typed" | "text" => Ok(Origin::TypedText),
            "uploaded_file" | "upload" | "file" => Ok(Origin::UploadedFile),
            "camera_capture" | "camera" => Ok(Origin::CameraCapture),
            "clipboard_paste" | "clipboard" | "paste" => Ok(Origin::ClipboardPaste),
            other => Err(crate::LecternError::validation(format!("unknown origin '{}'", other))),
        }
    }
}

/// The closed set of formats an input can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Word,
    Image,
    /// Unrecognized suffix; decoded as plain text.
    Fallback,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "plain_text",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Word => "word",
            DocumentFormat::Image => "image",
            DocumentFormat::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single submission to the pipeline.
///
/// `content` is owned and consumed by the extraction call.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub origin: Origin,
    /// File name as supplied by the user. The only trusted routing signal.
    pub file_name: Option<String>,
    /// Declared MIME type. Informational only.
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
}

impl InputDocument {
    pub fn new(origin: Origin, content: impl Into<Vec<u8>>) -> Self {
        Self {
            origin,
            file_name: None,
            mime_type: None,
            content: content.into(),
        }
    }

    /// Text typed directly by the user.
    pub fn typed(text: impl Into<String>) -> Self {
        Self::new(Origin::TypedText, text.into().into_bytes())
    }

    /// A file picked from disk or uploaded through the relay.
    pub fn upload(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::new(Origin::UploadedFile, content).with_file_name(file_name)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Success,
    /// Some pages could not be read; their segments are empty.
    Partial,
    Failed,
    /// Superseded by a newer submission. Never rendered.
    Cancelled,
}

/// Outcome of one extraction. Produced exactly once per [`InputDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub format: DocumentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// 1-based page numbers whose content could not be read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_pages: Vec<usize>,
}

impl ExtractionResult {
    pub fn success(format: DocumentFormat, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: ExtractionStatus::Success,
            error_detail: None,
            format,
            page_count: None,
            failed_pages: Vec::new(),
        }
    }

    pub fn failed(format: DocumentFormat, detail: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Failed,
            error_detail: Some(detail.into()),
            format,
            page_count: None,
            failed_pages: Vec::new(),
        }
    }

    pub fn cancelled(format: DocumentFormat) -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Cancelled,
            error_detail: Some("superseded by a newer submission".to_string()),
            format,
            page_count: None,
            failed_pages: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ExtractionStatus::Success | ExtractionStatus::Partial)
    }
}

/// Preprocessed image ready for OCR dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    /// Base64 of the encoded image, without a data-URL prefix.
    pub encoded_data: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// `None` when the original bytes were passed through undecoded.
    pub quality_factor: Option<f64>,
    pub grayscale: bool,
}

impl ImagePayload {
    /// Wrap raw bytes without decoding them.
    pub fn passthrough(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::from_encoded(STANDARD.encode(bytes), mime_type)
    }

    /// Wrap data that is already base64 without decoding it.
    pub fn from_encoded(encoded_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            encoded_data: encoded_data.into(),
            mime_type: mime_type.into(),
            width: 0,
            height: 0,
            quality_factor: None,
            grayscale: false,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.quality_factor.is_none()
    }

    /// `data:<mime>;base64,<data>`, the form the OCR relay expects.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded_data)
    }
}
