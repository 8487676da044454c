//! Plain text out of an uploaded resume file.
//!
//! Formats: PDF (per page, in page order), HTML (visible text only),
//! TXT (as-is) and DOCX (paragraphs in document order).
//! All functions here are blocking; async callers go through `spawn_blocking`.

mod docx;
mod html;
mod pdf;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use html::html_to_text;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to parse DOCX: {0}")]
    Docx(String),

    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl ParseError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Html,
    Txt,
    Docx,
}

impl DocumentFormat {
    /// Upload allow-list, lowercase, without the leading dot.
    pub const ALLOWED_EXTENSIONS: [&'static str; 4] = ["pdf", "html", "txt", "docx"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "html" => Some(DocumentFormat::Html),
            "txt" => Some(DocumentFormat::Txt),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Html => "html",
            DocumentFormat::Txt => "txt",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts plain text from `path`, interpreted as `format`.
pub fn parse_document(path: &Path, format: DocumentFormat) -> Result<String, ParseError> {
    match format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(path),
        DocumentFormat::Html => {
            let raw = read_utf8(path)?;
            Ok(html_to_text(&raw))
        }
        DocumentFormat::Txt => read_utf8(path),
        DocumentFormat::Docx => docx::extract_docx_text(path),
    }
}

fn read_utf8(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path).map_err(|e| ParseError::io(path, e))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_sample_docx, write_sample_pdf};

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension(".docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("doc"), None);
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            DocumentFormat::from_filename("jane-doe.Resume.HTML"),
            Some(DocumentFormat::Html)
        );
        assert_eq!(DocumentFormat::from_filename("noextension"), None);
        assert_eq!(DocumentFormat::from_filename("payload.exe"), None);
    }

    #[test]
    fn test_txt_is_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.txt");
        std::fs::write(&path, "Jane Doe\n  Senior Engineer\n").unwrap();

        let text = parse_document(&path, DocumentFormat::Txt).unwrap();
        assert_eq!(text, "Jane Doe\n  Senior Engineer\n");
    }

    #[test]
    fn test_html_path_strips_markup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.html");
        std::fs::write(
            &path,
            "<html><head><style>p { color: red; }</style></head>\
             <body><p>Jane   Doe</p><script>alert(1)</script><p>Rust\tEngineer</p></body></html>",
        )
        .unwrap();

        let text = parse_document(&path, DocumentFormat::Html).unwrap();
        assert_eq!(text, "Jane Doe\nRust Engineer");
        assert!(!text.chars().any(|c| c.is_control() && c != '\n'));
    }

    #[test]
    fn test_pdf_pages_are_concatenated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        write_sample_pdf(&path, &["Page one", "Page two", "Page three"]);

        let text = parse_document(&path, DocumentFormat::Pdf).unwrap();
        let first = text.find("Page one").expect("page one text");
        let second = text.find("Page two").expect("page two text");
        let third = text.find("Page three").expect("page three text");
        assert!(first < second && second < third);
    }

    #[test]
    fn test_docx_paragraphs_are_newline_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.docx");
        write_sample_docx(&path, &["Jane Doe", "Senior Rust Engineer"]);

        let text = parse_document(&path, DocumentFormat::Docx).unwrap();
        assert!(text.contains("Jane Doe\nSenior Rust Engineer"));
    }

    #[test]
    fn test_corrupt_pdf_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = parse_document(&path, DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(err, ParseError::Pdf(_)));
    }

    #[test]
    fn test_missing_file_carries_io_cause() {
        let err = parse_document(Path::new("/nonexistent/resume.txt"), DocumentFormat::Txt)
            .unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
