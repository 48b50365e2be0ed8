//! Word document adapter.
//!
//! Reads `word/document.xml` out of the WordprocessingML package and emits
//! the raw text of each paragraph followed by a blank line. Formatting,
//! headers, footers and comments are discarded. Legacy binary `.doc` files
//! are detected and rejected.

use crate::adapters::SourceAdapter;
use crate::types::{DocumentFormat, ExtractionResult, InputDocument};
use crate::{LecternError, Result};
use async_trait::async_trait;
use roxmltree::{Document, Node};
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";
const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Compound File Binary signature used by legacy `.doc` files.
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Extract raw paragraph text from a `.docx` package.
///
/// # Errors
///
/// `LecternError::Parsing` when the bytes are a legacy binary document, not a
/// zip archive, lack `word/document.xml`, or that part is not valid XML.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(OLE_SIGNATURE) {
        return Err(LecternError::parsing(
            "Legacy binary Word (.doc) documents are not supported; save the file as .docx",
        ));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| LecternError::parsing_with_source("Failed to open Word document as a zip archive", e))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| LecternError::parsing_with_source(format!("Word document has no {}", DOCUMENT_PART), e))?
        .read_to_string(&mut xml)
        .map_err(|e| LecternError::parsing_with_source(format!("Failed to read {}", DOCUMENT_PART), e))?;

    let document = Document::parse(&xml)
        .map_err(|e| LecternError::parsing_with_source(format!("Invalid XML in {}", DOCUMENT_PART), e))?;

    let mut text = String::new();
    for paragraph in document
        .descendants()
        .filter(|n| is_w(n, "p") && !has_w_ancestor(n, "p"))
    {
        paragraph_text(paragraph, &mut text);
        text.push_str("\n\n");
    }

    Ok(text)
}

fn is_w(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace().is_none_or(|ns| ns == WORDML_NS)
}

fn has_w_ancestor(node: &Node, name: &str) -> bool {
    node.ancestors().skip(1).any(|a| is_w(&a, name))
}

fn paragraph_text(paragraph: Node, out: &mut String) {
    for node in paragraph.descendants() {
        if !node.is_element() {
            continue;
        }
        // w:delText and w:instrText are not visible text and never match here.
        match node.tag_name().name() {
            "t" if is_w(&node, "t") => {
                if let Some(t) = node.text() {
                    out.push_str(t);
                }
            }
            "tab" if is_w(&node, "tab") && has_w_ancestor(&node, "r") => out.push('\t'),
            "br" | "cr" if is_w(&node, node.tag_name().name()) => out.push('\n'),
            _ => {}
        }
    }
}

/// Word document adapter.
pub struct WordAdapter;

impl WordAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for WordAdapter {
    fn name(&self) -> &str {
        "word-adapter"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Word
    }

    async fn extract(&self, document: InputDocument) -> Result<ExtractionResult> {
        let content = document.content;
        let text = tokio::task::spawn_blocking(move || extract_docx_text(&content)).await??;
        Ok(ExtractionResult::success(DocumentFormat::Word, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
            WORDML_NS, body
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_end_with_blank_line() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello</w:t></w:r><w:r><w:t xml:space=\"preserve\"> world</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second</w:t></w:r></w:p>",
        );

        assert_eq!(extract_docx_text(&bytes).unwrap(), "Hello world\n\nSecond\n\n");
    }

    #[test]
    fn test_tabs_and_breaks() {
        let bytes = docx_with_body("<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>");
        assert_eq!(extract_docx_text(&bytes).unwrap(), "a\tb\nc\n\n");
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let bytes = docx_with_body(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr><w:r><w:t>x</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx_text(&bytes).unwrap(), "x\n\n");
    }

    #[test]
    fn test_table_cells_are_paragraphs() {
        let bytes = docx_with_body(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        assert_eq!(extract_docx_text(&bytes).unwrap(), "A1\n\nB1\n\n");
    }

    #[test]
    fn test_deleted_text_is_skipped() {
        let bytes = docx_with_body(
            "<w:p><w:del><w:r><w:delText>gone</w:delText></w:r></w:del><w:ins><w:r><w:t>kept</w:t></w:r></w:ins></w:p>",
        );
        assert_eq!(extract_docx_text(&bytes).unwrap(), "kept\n\n");
    }

    #[test]
    fn test_not_a_zip() {
        let err = extract_docx_text(b"PK but not really").unwrap_err();
        assert!(err.to_string().contains("zip archive"));
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("word/styles.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_invalid_xml() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<w:document><w:body>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(err.to_string().contains("Invalid XML"));
    }

    #[test]
    fn test_legacy_doc_rejected() {
        let mut bytes = OLE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 512]);

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(err.to_string().contains(".doc"));
    }

    #[tokio::test]
    async fn test_adapter() {
        let bytes = docx_with_body("<w:p><w:r><w:t>Body</w:t></w:r></w:p>");
        let result = WordAdapter::new()
            .extract(InputDocument::upload("memo.docx", bytes))
            .await
            .unwrap();

        assert_eq!(result.text, "Body\n\n");
        assert_eq!(result.format, DocumentFormat::Word);
    }
}
