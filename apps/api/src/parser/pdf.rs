use std::path::Path;

use lopdf::Document;

use super::ParseError;

/// Concatenates the text of every page, in page order.
pub(super) fn extract_pdf_text(path: &Path) -> Result<String, ParseError> {
    let doc = Document::load(path)?;

    let mut text = String::new();
    // get_pages() is a BTreeMap keyed by page number
    for page_number in doc.get_pages().keys() {
        text.push_str(&doc.extract_text(&[*page_number])?);
    }
    Ok(text)
}
