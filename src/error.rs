//! Error types for the spool-flatten library.
//!
//! Every failure is fatal for the run: a flattened document with a missing
//! or blank page would print as a corrupted job, so there is no per-page
//! tolerance and no fallback rendering path. Callers that need to react
//! differently per failure class use [`FlattenError::kind`]:
//!
//! * [`ErrorKind::Load`]   — the input could not be opened as a PDF.
//! * [`ErrorKind::Render`] — a specific page could not be rasterised.
//! * [`ErrorKind::Write`]  — the output could not be encoded or persisted.
//! * [`ErrorKind::Setup`]  — bad configuration or no pdfium library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the spool-flatten library.
#[derive(Debug, Error)]
pub enum FlattenError {
    // ── Load errors ───────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document parsed but contains no pages.
    #[error("PDF '{path}' has no pages; nothing to flatten")]
    EmptyDocument { path: PathBuf },

    // ── Render errors ─────────────────────────────────────────────────────
    /// pdfium could not access or rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The page would render larger than the configured pixel cap.
    #[error(
        "Page {page} would render at {width}x{height} px, above the {limit} px limit.\n\
Lower --dpi for this document."
    )]
    PageTooLarge {
        page: usize,
        width: u32,
        height: u32,
        limit: u32,
    },

    // ── Write errors ──────────────────────────────────────────────────────
    /// A flattened page could not be encoded into the output PDF.
    #[error("Encoding page {page} into the output PDF failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The assembled document could not be serialised.
    #[error("Serialising the output PDF failed: {0}")]
    SerializeFailed(String),

    /// The directory that should contain the output does not exist.
    #[error("Output directory does not exist: '{path}'")]
    OutputDirMissing { path: PathBuf },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Setup errors ──────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the spoolflat executable, install it system-wide,\n\
or pass its location with --pdfium-lib /path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),
}

/// Coarse failure class of a [`FlattenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Setup,
    Load,
    Render,
    Write,
}

impl ErrorKind {
    /// Process exit status for this failure class.
    ///
    /// `2` is left to clap for usage errors.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Setup => 1,
            ErrorKind::Load => 3,
            ErrorKind::Render => 4,
            ErrorKind::Write => 5,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Setup => "SetupError",
            ErrorKind::Load => "LoadError",
            ErrorKind::Render => "RenderError",
            ErrorKind::Write => "WriteError",
        })
    }
}

impl FlattenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlattenError::FileNotFound { .. }
            | FlattenError::PermissionDenied { .. }
            | FlattenError::NotAPdf { .. }
            | FlattenError::CorruptPdf { .. }
            | FlattenError::PasswordRequired { .. }
            | FlattenError::WrongPassword { .. }
            | FlattenError::EmptyDocument { .. } => ErrorKind::Load,
            FlattenError::RenderFailed { .. } | FlattenError::PageTooLarge { .. } => {
                ErrorKind::Render
            }
            FlattenError::EncodeFailed { .. }
            | FlattenError::SerializeFailed(_)
            | FlattenError::OutputDirMissing { .. }
            | FlattenError::OutputWriteFailed { .. } => ErrorKind::Write,
            FlattenError::InvalidConfig(_) | FlattenError::PdfiumBindingFailed(_) => {
                ErrorKind::Setup
            }
        }
    }

    /// 1-indexed page number for page-scoped errors.
    pub fn page(&self) -> Option<usize> {
        match self {
            FlattenError::RenderFailed { page, .. }
            | FlattenError::PageTooLarge { page, .. }
            | FlattenError::EncodeFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failed_names_page() {
        let e = FlattenError::RenderFailed {
            page: 3,
            detail: "unsupported shading".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Render);
        assert_eq!(e.page(), Some(3));
        assert!(e.to_string().contains("page 3"), "got: {e}");
    }

    #[test]
    fn load_errors_have_no_page() {
        let e = FlattenError::EmptyDocument {
            path: PathBuf::from("empty.pdf"),
        };
        assert_eq!(e.kind(), ErrorKind::Load);
        assert_eq!(e.page(), None);
        assert!(e.to_string().contains("empty.pdf"));
    }

    #[test]
    fn write_error_keeps_io_source() {
        use std::error::Error as _;
        let e = FlattenError::OutputWriteFailed {
            path: PathBuf::from("/out/doc.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.kind(), ErrorKind::Write);
        assert!(e.source().is_some());
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let codes = [
            ErrorKind::Setup.exit_code(),
            ErrorKind::Load.exit_code(),
            ErrorKind::Render.exit_code(),
            ErrorKind::Write.exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            assert_ne!(*a, 2, "2 is reserved for usage errors");
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn kind_display_matches_taxonomy() {
        assert_eq!(ErrorKind::Load.to_string(), "LoadError");
        assert_eq!(ErrorKind::Render.to_string(), "RenderError");
        assert_eq!(ErrorKind::Write.to_string(), "WriteError");
    }
}
