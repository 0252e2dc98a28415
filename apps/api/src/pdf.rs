//! PDF text source — a thin wrapper over `pdf-extract`.
//!
//! Extraction is CPU-bound and must run inside `tokio::task::spawn_blocking`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF extraction failed: {0}")]
    Extract(String),

    #[error("PDF contains no extractable text")]
    NoText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    pub file_name: String,
    pub byte_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfText {
    pub raw_text: String,
    pub page_count: usize,
    pub metadata: PdfMetadata,
}

/// Extracts the text of every page, joined by blank lines.
pub fn extract_pdf_text(bytes: &[u8], file_name: &str) -> Result<PdfText, PdfError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PdfError::Extract(e.to_string()))?;
    let page_count = pages.len();
    let raw_text = join_pages(&pages);

    if raw_text.is_empty() {
        return Err(PdfError::NoText);
    }

    debug!(
        "Extracted {} chars from {file_name} ({page_count} pages)",
        raw_text.len()
    );
    Ok(PdfText {
        raw_text,
        page_count,
        metadata: PdfMetadata {
            file_name: file_name.to_string(),
            byte_size: bytes.len(),
        },
    })
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
