//! Format routing.
//!
//! Selects exactly one [`DocumentFormat`] per input. Named inputs route on the
//! lower-cased text after the last `.` of the file name; the declared MIME type
//! never overrides it. Unnamed inputs route on their origin.

use crate::types::{DocumentFormat, InputDocument, Origin};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";
pub const PNG_MIME_TYPE: &str = "image/png";
pub const BMP_MIME_TYPE: &str = "image/bmp";

static EXT_TO_FORMAT: Lazy<HashMap<&'static str, DocumentFormat>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("txt", DocumentFormat::PlainText);

    m.insert("pdf", DocumentFormat::Pdf);

    m.insert("doc", DocumentFormat::Word);
    m.insert("docx", DocumentFormat::Word);

    m.insert("jpg", DocumentFormat::Image);
    m.insert("jpeg", DocumentFormat::Image);
    m.insert("png", DocumentFormat::Image);
    m.insert("bmp", DocumentFormat::Image);

    m
});

/// Lower-cased text after the last `.`, if any.
///
/// A leading dot alone (`.bashrc`) is not treated as a suffix.
pub fn file_suffix(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Route a file name. Unknown or missing suffixes fall back to plain text.
pub fn format_for_file_name(file_name: &str) -> DocumentFormat {
    file_suffix(file_name)
        .and_then(|ext| EXT_TO_FORMAT.get(ext.as_str()).copied())
        .unwrap_or(DocumentFormat::Fallback)
}

/// Route an input document.
pub fn route(document: &InputDocument) -> DocumentFormat {
    match &document.file_name {
        Some(name) => format_for_file_name(name),
        None => match document.origin {
            Origin::TypedText => DocumentFormat::PlainText,
            Origin::CameraCapture | Origin::ClipboardPaste => DocumentFormat::Image,
            Origin::UploadedFile => DocumentFormat::Fallback,
        },
    }
}

/// MIME type implied by an image file name, for payloads passed through undecoded.
pub fn image_mime_for(file_name: Option<&str>, declared: Option<&str>) -> String {
    let from_suffix = file_name.and_then(file_suffix).and_then(|ext| match ext.as_str() {
        "jpg" | "jpeg" => Some(JPEG_MIME_TYPE),
        "png" => Some(PNG_MIME_TYPE),
        "bmp" => Some(BMP_MIME_TYPE),
        _ => None,
    });

    match (from_suffix, declared) {
        (Some(mime), _) => mime.to_string(),
        (None, Some(declared)) if declared.starts_with("image/") => declared.to_string(),
        _ => JPEG_MIME_TYPE.to_string(),
    }
}
