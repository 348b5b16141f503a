//! PDF text extraction.
//!
//! Text comes from `pdf-extract`; the page count is read from the page tree with `lopdf`.

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{RagError, Result};

/// Text and page count pulled from a single PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Concatenated text of every page, trimmed.
    pub text: String,
    /// Number of pages in the document's page tree.
    pub pages: usize,
}

/// Extracts the full text and page count from raw PDF bytes.
pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument> {
    if bytes.is_empty() {
        return Err(RagError::Pdf("empty file".to_string()));
    }
    let document = Document::load_mem(bytes).map_err(|err| RagError::Pdf(err.to_string()))?;
    let pages = document.get_pages().len();
    let text = extract_text(bytes)?;
    let text = text.trim().to_string();
    debug!(pages, chars = text.chars().count(), "extracted pdf text");
    Ok(ExtractedDocument { text, pages })
}

/// Runs `pdf-extract`, which panics on some malformed font and resource dictionaries that
/// `lopdf` loads without complaint.
fn extract_text(bytes: &[u8]) -> Result<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(RagError::Pdf(err.to_string())),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown failure".to_string());
            warn!(reason = %reason, "text extraction aborted");
            Err(RagError::Pdf(format!("malformed PDF: {reason}")))
        }
    }
}

/// Returns true when the filename carries a `.pdf` extension, ignoring case.
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}
