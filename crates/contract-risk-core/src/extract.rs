use std::path::Path;

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Input formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Pick a format from the file extension, falling back to the `%PDF` magic bytes.
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Self {
        let by_extension = path
            .and_then(|p| p.extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if by_extension || bytes.starts_with(PDF_MAGIC) {
            Self::Pdf
        } else {
            Self::PlainText
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("text input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("failed to parse PDF document: {0}")]
    Pdf(String),
}

/// Turn uploaded bytes into document text.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::PlainText => {
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            Ok(std::str::from_utf8(bytes)?.to_string())
        }
        DocumentKind::Pdf => Ok(extract_pdf_pages(bytes)?.join("\n")),
    }
}

/// Extract text per page, in page order. Pages without extractable text become empty strings.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|err| ExtractionError::Pdf(err.to_string()))?;
    let pages = doc.get_pages();
    debug!(pages = pages.len(), "extracting PDF text");
    let texts = pages
        .keys()
        .map(|&page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(err) => {
                warn!(page = page_number, error = %err, "page yielded no extractable text");
                String::new()
            }
        })
        .collect();
    Ok(texts)
}
