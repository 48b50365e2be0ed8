//! PDF adapter.
//!
//! Pages are read in increasing page-number order. For each page the
//! text-showing operators of its content stream (`Tj`, `TJ`, `'` and `"`)
//! are collected, joined with a single space, and terminated with `\n`. A
//! page that cannot be read contributes an empty segment in its place.

use crate::adapters::SourceAdapter;
use crate::types::{DocumentFormat, ExtractionResult, ExtractionStatus, InputDocument};
use crate::{LecternError, Result};
use async_trait::async_trait;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

/// Text of a PDF, page by page.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
    /// 1-based numbers of pages that contributed an empty segment because
    /// their content could not be read.
    pub failed_pages: Vec<usize>,
}

/// Join per-page outcomes into the final text.
///
/// `pages` must be in page order. Successful pages join their tokens with a
/// single space; failed pages become empty. Every page ends with `\n`.
pub fn assemble_pages<E>(pages: Vec<std::result::Result<Vec<String>, E>>) -> PdfText {
    let page_count = pages.len();
    let mut text = String::new();
    let mut failed_pages = Vec::new();

    for (index, page) in pages.into_iter().enumerate() {
        match page {
            Ok(tokens) => text.push_str(&tokens.join(" ")),
            Err(_) => failed_pages.push(index + 1),
        }
        text.push('\n');
    }

    PdfText {
        text,
        page_count,
        failed_pages,
    }
}

/// Extract text from an in-memory PDF.
///
/// # Errors
///
/// `LecternError::Parsing` if the buffer cannot be opened as a PDF. Failures
/// on individual pages are recorded in [`PdfText::failed_pages`] instead.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<PdfText> {
    let document =
        Document::load_mem(bytes).map_err(|e| LecternError::parsing_with_source("Failed to open PDF document", e))?;

    let pages: Vec<_> = document
        .get_pages()
        .into_iter()
        .map(|(number, page_id)| {
            page_tokens(&document, page_id).inspect_err(|e| {
                tracing::warn!(page = number, error = %e, "Failed to read PDF page, leaving it empty");
            })
        })
        .collect();

    Ok(assemble_pages(pages))
}

fn page_tokens(document: &Document, page_id: ObjectId) -> Result<Vec<String>> {
    let raw = page_content(document, page_id)?;

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    check_content_syntax(&raw)?;
    let content =
        Content::decode(&raw).map_err(|e| LecternError::parsing_with_source("Failed to decode page content stream", e))?;

    let mut tokens = Vec::new();
    for operation in &content.operations {
        let token = match operation.operator.as_str() {
            "Tj" | "'" => operation.operands.first().and_then(string_operand),
            "\"" => operation.operands.get(2).and_then(string_operand),
            "TJ" => operation.operands.first().and_then(array_operand),
            _ => None,
        };

        if let Some(token) = token
            && !token.is_empty()
        {
            tokens.push(token);
        }
    }

    Ok(tokens)
}

/// Concatenated, decompressed content streams of a page.
///
/// Unlike `Document::get_page_content`, a missing stream object or a stream
/// that cannot be decompressed is an error.
fn page_content(document: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();

    for stream_id in document.get_page_contents(page_id) {
        let stream = document.get_object(stream_id).and_then(Object::as_stream).map_err(|e| {
            LecternError::parsing_with_source(
                format!("Content stream {} {} R is missing", stream_id.0, stream_id.1),
                e,
            )
        })?;

        let flate = stream
            .filters()
            .ok()
            .and_then(|filters| filters.first().copied())
            .is_some_and(|filter| filter == b"FlateDecode");
        if flate && !stream.content.is_empty() && !has_zlib_header(&stream.content) {
            return Err(LecternError::parsing(format!(
                "Content stream {} {} R is not FlateDecode data",
                stream_id.0, stream_id.1
            )));
        }

        let data = stream
            .get_plain_content()
            .map_err(|e| LecternError::parsing_with_source("Failed to decompress page content stream", e))?;
        content.extend_from_slice(&data);
        content.push(b'\n');
    }

    Ok(content)
}

fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Reject content that ends inside a string, array, dictionary or inline
/// image, or that closes one it never opened. `Content::decode` stops at
/// the first malformed operation and keeps what it parsed so far.
fn check_content_syntax(raw: &[u8]) -> Result<()> {
    let mut arrays = 0usize;
    let mut dicts = 0usize;
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'%' => {
                while i < raw.len() && raw[i] != b'\n' && raw[i] != b'\r' {
                    i += 1;
                }
            }
            b'(' => {
                i = skip_literal_string(raw, i)?;
                continue;
            }
            b')' => return Err(malformed("unbalanced ')'")),
            b'<' if raw.get(i + 1) == Some(&b'<') => {
                dicts += 1;
                i += 2;
                continue;
            }
            b'>' if raw.get(i + 1) == Some(&b'>') => {
                dicts = dicts.checked_sub(1).ok_or_else(|| malformed("unbalanced '>>'"))?;
                i += 2;
                continue;
            }
            b'<' => {
                let end = raw[i..]
                    .iter()
                    .position(|&b| b == b'>')
                    .ok_or_else(|| malformed("unterminated hex string"))?;
                i += end + 1;
                continue;
            }
            b'[' => arrays += 1,
            b']' => arrays = arrays.checked_sub(1).ok_or_else(|| malformed("unbalanced ']'"))?,
            b'I' if is_keyword_at(raw, i, b"ID") => {
                i = skip_inline_image_data(raw, i + 2)?;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if arrays != 0 {
        return Err(malformed("unterminated array"));
    }
    if dicts != 0 {
        return Err(malformed("unterminated dictionary"));
    }
    Ok(())
}

fn malformed(reason: &str) -> LecternError {
    LecternError::parsing(format!("Malformed page content stream: {}", reason))
}

/// Index just past the literal string opening at `start`.
fn skip_literal_string(raw: &[u8], start: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut i = start;

    while i < raw.len() {
        match raw[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(malformed("unterminated string"))
}

/// `keyword` at `i`, delimited by whitespace or the stream bounds.
fn is_keyword_at(raw: &[u8], i: usize, keyword: &[u8]) -> bool {
    let before = i == 0 || raw[i - 1].is_ascii_whitespace();
    let after = raw.get(i + keyword.len()).is_none_or(u8::is_ascii_whitespace);
    before && after && raw[i..].starts_with(keyword)
}

/// Inline image data is binary; skip to just past its closing `EI`.
fn skip_inline_image_data(raw: &[u8], from: usize) -> Result<usize> {
    (from..raw.len())
        .find(|&j| is_keyword_at(raw, j, b"EI"))
        .map(|j| j + 2)
        .ok_or_else(|| malformed("unterminated inline image"))
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// `TJ` arrays interleave strings with kerning offsets; only the strings carry text.
fn array_operand(object: &Object) -> Option<String> {
    match object {
        Object::Array(items) => Some(items.iter().filter_map(string_operand).collect()),
        _ => None,
    }
}

/// Decode a PDF string operand. UTF-16BE with a byte-order mark is decoded
/// as such; anything else is read as single-byte Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// PDF adapter.
pub struct PdfAdapter;

impl PdfAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for PdfAdapter {
    fn name(&self) -> &str {
        "pdf-adapter"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    async fn extract(&self, document: InputDocument) -> Result<ExtractionResult> {
        let content = document.content;
        let pdf = tokio::task::spawn_blocking(move || extract_pdf_text(&content)).await??;

        let (status, error_detail) = if pdf.failed_pages.is_empty() {
            (ExtractionStatus::Success, None)
        } else {
            (
                ExtractionStatus::Partial,
                Some(format!(
                    "{} of {} pages could not be read",
                    pdf.failed_pages.len(),
                    pdf.page_count
                )),
            )
        };

        Ok(ExtractionResult {
            text: pdf.text,
            status,
            error_detail,
            format: DocumentFormat::Pdf,
            page_count: Some(pdf.page_count),
            failed_pages: pdf.failed_pages,
        })
    }
}
