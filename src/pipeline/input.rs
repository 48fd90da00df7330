//! Input resolution: validate a user-supplied path before pdfium sees it.
//!
//! pdfium reports a missing file, a permission problem and a non-PDF file
//! with the same opaque "file error", so the cheap checks happen here first
//! and produce precise [`FlattenError`] variants. In-memory inputs are staged
//! into a [`NamedTempFile`] that lives as long as the [`ResolvedInput`] and
//! is removed on drop on every exit path.

use crate::error::FlattenError;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Readers accept a header anywhere in the first KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A validated input PDF on disk.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, size: u64 },
    /// Input came from memory; bytes were written to a temp file that is
    /// kept alive until processing completes.
    Staged { file: NamedTempFile, size: u64 },
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Staged { file, .. } => file.path(),
        }
    }

    /// Size of the input in bytes.
    pub fn size(&self) -> u64 {
        match self {
            ResolvedInput::Local { size, .. } | ResolvedInput::Staged { size, .. } => *size,
        }
    }
}

/// Validate a local file: it must exist, be readable and look like a PDF.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, FlattenError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(FlattenError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(FlattenError::NotAPdf {
            path,
            magic: [0; 4],
        });
    }

    let mut file = File::open(&path).map_err(|e| open_error(&path, e))?;

    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    Read::by_ref(&mut file)
        .take(HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut head)
        .map_err(|e| FlattenError::CorruptPdf {
            path: path.clone(),
            detail: format!("could not read header: {e}"),
        })?;
    check_magic(&path, &head)?;

    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    debug!("Resolved local PDF: {} ({} bytes)", path.display(), size);
    Ok(ResolvedInput::Local { path, size })
}

/// Stage in-memory PDF bytes into a managed temp file.
pub fn stage_bytes(bytes: &[u8]) -> Result<ResolvedInput, FlattenError> {
    let label = PathBuf::from("<memory>");
    check_magic(&label, &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)])?;

    let stage_err = |e: std::io::Error| FlattenError::CorruptPdf {
        path: label.clone(),
        detail: format!("could not stage input: {e}"),
    };
    let mut file = NamedTempFile::new().map_err(stage_err)?;
    file.write_all(bytes).map_err(stage_err)?;
    file.flush().map_err(stage_err)?;

    debug!("Staged {} input bytes at {}", bytes.len(), file.path().display());
    Ok(ResolvedInput::Staged {
        file,
        size: bytes.len() as u64,
    })
}

fn open_error(path: &Path, e: std::io::Error) -> FlattenError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => FlattenError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => FlattenError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => FlattenError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("could not open: {e}"),
        },
    }
}

fn check_magic(path: &Path, head: &[u8]) -> Result<(), FlattenError> {
    if let Some(offset) = head.windows(4).position(|w| w == b"%PDF") {
        if offset > 0 {
            warn!(
                "{}: PDF header found at byte {} after leading junk",
                path.display(),
                offset
            );
        }
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(FlattenError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf"))
            .err()
            .expect("should fail");
        assert!(matches!(err, FlattenError::FileNotFound { .. }));
    }

    #[test]
    fn text_file_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.pdf");
        std::fs::write(&p, b"hello world").unwrap();
        match resolve_local(&p) {
            Err(FlattenError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"hell"),
            other => panic!("expected NotAPdf, got {:?}", other.err()),
        }
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.pdf");
        std::fs::write(&p, b"").unwrap();
        assert!(matches!(
            resolve_local(&p),
            Err(FlattenError::NotAPdf { magic: [0, 0, 0, 0], .. })
        ));
    }

    #[test]
    fn header_after_leading_junk_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("junk.pdf");
        std::fs::write(&p, b"\xEF\xBB\xBF\n%PDF-1.4\n").unwrap();
        let resolved = resolve_local(&p).expect("header within window");
        assert_eq!(resolved.path(), p.as_path());
        assert_eq!(resolved.size(), 13);
    }

    #[test]
    fn header_past_first_kib_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("late.pdf");
        let mut bytes = vec![b' '; HEADER_SEARCH_WINDOW];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        std::fs::write(&p, &bytes).unwrap();
        assert!(matches!(resolve_local(&p), Err(FlattenError::NotAPdf { .. })));
    }

    #[test]
    fn open_failures_keep_the_real_cause() {
        let p = Path::new("busy.pdf");
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(open_error(p, denied), FlattenError::PermissionDenied { .. }));

        let gone = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(open_error(p, gone), FlattenError::FileNotFound { .. }));

        match open_error(p, std::io::Error::other("too many open files")) {
            FlattenError::CorruptPdf { detail, .. } => {
                assert!(detail.contains("too many open files"), "{detail}")
            }
            other => panic!("expected CorruptPdf, got {other:?}"),
        }
    }

    #[test]
    fn staged_bytes_removed_on_drop() {
        let resolved = stage_bytes(b"%PDF-1.7\n%%EOF\n").expect("stage");
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(resolved.size(), 15);
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn staging_rejects_non_pdf_bytes() {
        assert!(matches!(
            stage_bytes(b"PK\x03\x04zip"),
            Err(FlattenError::NotAPdf { .. })
        ));
    }
}
