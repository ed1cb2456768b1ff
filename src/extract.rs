//! PDF text extraction.

use lopdf::Document;
use tracing::{debug, info};

use crate::core::models::ExtractedDocument;
use crate::errors::AnalyzeError;

/// Parses `payload` as a PDF and returns its text in page order.
///
/// The page count comes from the document's page tree and does not depend on
/// how much text could be recovered; pages whose content streams cannot be
/// decoded contribute no text but are still counted.
///
/// # Errors
///
/// Returns `UnreadableDocument` for empty payloads, anything the parser rejects,
/// and encrypted documents that cannot be opened with an empty user password.
pub fn extract(payload: &[u8]) -> Result<ExtractedDocument, AnalyzeError> {
    if payload.is_empty() {
        return Err(AnalyzeError::UnreadableDocument(
            "the uploaded file is empty".to_string(),
        ));
    }

    let mut doc = Document::load_mem(payload)?;
    // Owner-password-only files open with the empty user password.
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| {
            AnalyzeError::UnreadableDocument(format!(
                "the document is password protected: {e}"
            ))
        })?;
        debug!("Decrypted PDF with the empty user password");
    }

    // BTreeMap keyed by page number, so iteration is already in document order.
    let pages = doc.get_pages();
    let page_count = pages.len();

    let mut text = String::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let page_text = page_text.trim_end();
                if page_text.is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(page_text);
            }
            Err(e) => debug!(page = page_number, error = %e, "Skipping page without decodable text"),
        }
    }

    info!(
        page_count,
        text_chars = text.chars().count(),
        "Extracted text from PDF"
    );

    Ok(ExtractedDocument { page_count, text })
}
