//! Resume text extraction.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

/// Extracted text shorter than this is treated as unreadable.
pub const MIN_USABLE_TEXT_CHARS: usize = 50;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the document's plain text, or an empty string when the file
    /// cannot be read (scanned images, corrupt files).
    async fn extract_text(&self, document: Bytes) -> String;
}

/// PDF extractor backed by `pdf-extract`. Parsing is CPU-bound, so it runs on
/// the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, document: Bytes) -> String {
        let outcome =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&document))
                .await;
        match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("PDF text extraction failed: {e}");
                String::new()
            }
            Err(e) => {
                warn!("PDF extraction task failed: {e}");
                String::new()
            }
        }
    }
}

/// Whitespace-trimmed text, or `None` when too little remains to be useful.
pub fn usable_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (trimmed.chars().count() >= MIN_USABLE_TEXT_CHARS).then_some(trimmed)
}
