use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::resume::{NewResume, Resume};
use crate::parser::{parse_document, DocumentFormat, ParseError};
use crate::pipeline::{TaskState, TaskTracker, TransitionError};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "unsupported file extension '{0}' (allowed: {})",
        DocumentFormat::ALLOWED_EXTENSIONS.join(", ")
    )]
    UnsupportedExtension(String),

    #[error("missing multipart field `{0}`")]
    MissingField(&'static str),

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("failed to store upload: {0}")]
    Write(#[from] std::io::Error),

    #[error(transparent)]
    Parse(ParseError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Task(#[from] TransitionError),
}

/// A fully received multipart upload.
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file_name: String,
    pub bytes: Bytes,
    pub candidate_name: String,
    pub position: String,
}

/// Resolves the document format from the client file name, rejecting
/// anything outside the allow-list.
pub fn check_extension(file_name: &str) -> Result<DocumentFormat, UploadError> {
    DocumentFormat::from_filename(file_name).ok_or_else(|| {
        UploadError::UnsupportedExtension(
            Path::new(file_name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        )
    })
}

/// Writes, parses and registers an uploaded resume.
///
/// The bytes go to a temporary file inside `upload_dir` that is discarded if
/// parsing fails; on success it is kept as `{uuid}.{ext}`. If the store insert
/// fails the kept file is removed again.
pub async fn ingest_upload(
    store: &dyn Store,
    upload_dir: &Path,
    max_size: usize,
    form: UploadForm,
) -> Result<Resume, UploadError> {
    let format = check_extension(&form.file_name)?;
    if form.bytes.len() > max_size {
        return Err(UploadError::TooLarge { limit: max_size });
    }

    let mut tracker = TaskTracker::new(Uuid::new_v4());
    tracker.advance(TaskState::Parsing)?;

    tokio::fs::create_dir_all(upload_dir).await?;
    let dir = upload_dir.to_path_buf();
    let bytes = form.bytes.clone();
    let (stored_path, content) =
        tokio::task::spawn_blocking(move || write_and_parse(&dir, &bytes, format))
            .await
            .map_err(|e| UploadError::Write(std::io::Error::other(e)))??;

    tracker.advance(TaskState::Storing)?;
    let inserted = store
        .insert_resume(NewResume {
            candidate_name: form.candidate_name,
            position: form.position,
            file_path: stored_path.display().to_string(),
            file_name: form.file_name,
            file_type: format,
            content,
        })
        .await;

    match inserted {
        Ok(resume) => {
            tracker.advance(TaskState::Done)?;
            info!(
                resume_id = %resume.id,
                file_type = %format,
                path = %stored_path.display(),
                "Resume uploaded"
            );
            Ok(resume)
        }
        Err(e) => {
            tracker.fail();
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                warn!(path = %stored_path.display(), "Could not remove orphaned upload: {rm}");
            }
            Err(UploadError::Store(e))
        }
    }
}

fn write_and_parse(
    dir: &Path,
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<(PathBuf, String), UploadError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;

    // Dropping `tmp` on the error path deletes the partial upload.
    let content = parse_document(tmp.path(), format).map_err(UploadError::Parse)?;

    let final_path = dir.join(format!("{}.{}", Uuid::new_v4(), format.as_str()));
    tmp.persist(&final_path).map_err(|e| UploadError::Write(e.error))?;
    Ok((final_path, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::write_sample_pdf;

    fn form(file_name: &str, bytes: impl Into<Bytes>) -> UploadForm {
        UploadForm {
            file_name: file_name.to_string(),
            bytes: bytes.into(),
            candidate_name: "Jane Doe".to_string(),
            position: "Backend Engineer".to_string(),
        }
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_unsupported_extension_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let upload_dir = root.path().join("uploads");
        let store = MemoryStore::new();

        let err = ingest_upload(&store, &upload_dir, 1024, form("cv.exe", "MZ"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UnsupportedExtension(ext) if ext == "exe"));
        assert!(!upload_dir.exists());
    }

    #[tokio::test]
    async fn test_txt_upload_is_stored_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();

        let resume = ingest_upload(&store, dir.path(), 1024, form("Jane.TXT", "Jane Doe\nRust"))
            .await
            .unwrap();

        assert_eq!(resume.status, crate::models::resume::ResumeStatus::Pending);
        assert_eq!(resume.file_type, DocumentFormat::Txt);
        assert_eq!(resume.content, "Jane Doe\nRust");
        assert!(resume.file_path.ends_with(".txt"));
        assert!(Path::new(&resume.file_path).exists());
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_pdf_upload_extracts_every_page() {
        let src = tempfile::tempdir().unwrap();
        let pdf = src.path().join("resume.pdf");
        write_sample_pdf(&pdf, &["First page", "Second page", "Third page"]);
        let bytes = std::fs::read(&pdf).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let resume = ingest_upload(&store, dir.path(), 1 << 20, form("resume.pdf", bytes))
            .await
            .unwrap();

        assert!(resume.content.contains("First page"));
        assert!(resume.content.contains("Third page"));
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();

        let err = ingest_upload(&store, dir.path(), 1024, form("cv.pdf", "garbage"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Parse(_)));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_store_failure_removes_persisted_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        let err = ingest_upload(&store, dir.path(), 1024, form("cv.txt", "Jane"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Store(_)));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();

        let err = ingest_upload(&store, dir.path(), 4, form("cv.txt", "too long"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { limit: 4 }));
        assert_eq!(dir_entries(dir.path()), 0);
    }
}
