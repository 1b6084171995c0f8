//! PDF text extraction, one entry per page

use std::path::Path;

use crate::error::{Error, Result};

/// Text of a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Page number (1-indexed)
    pub number: u32,
    /// Extracted text
    pub text: String,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Document name for a PDF path: the file name without directories or extension
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// Page-aware PDF parser
pub struct PdfParser;

impl PdfParser {
    /// Read a PDF from disk and extract its pages
    pub fn extract_pages(path: &Path) -> Result<Vec<PageText>> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf");
        Self::parse(filename, &data)
    }

    /// Extract per-page text from PDF bytes
    ///
    /// Uses lopdf page by page. When lopdf cannot load the file or finds no
    /// text at all, the whole document is read with pdf-extract and returned
    /// as a single page.
    pub fn parse(filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::file_parse(filename, "not a PDF file"));
        }

        match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let mut pages = Vec::new();
                for page_number in doc.get_pages().keys() {
                    let text = match doc.extract_text(&[*page_number]) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(
                                "Could not extract text from page {} of '{}': {}",
                                page_number,
                                filename,
                                e
                            );
                            String::new()
                        }
                    };
                    pages.push(PageText::new(*page_number, text));
                }

                if pages.iter().any(|p| !p.text.trim().is_empty()) {
                    return Ok(pages);
                }
                tracing::debug!("lopdf found no text in '{}', trying pdf-extract", filename);
            }
            Err(e) => {
                tracing::warn!("lopdf failed on '{}': {}, trying pdf-extract", filename, e);
            }
        }

        let content = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        Ok(vec![PageText::new(1, content)])
    }
}
