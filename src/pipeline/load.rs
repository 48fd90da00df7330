//! PDF loading: bind pdfium and open the source document.
//!
//! [`PdfEngine`] owns the pdfium binding for one run. [`SourceDocument`]
//! borrows it and owns the open document; dropping the document closes it
//! and releases the input file handle, so every early return through `?`
//! cleans up without manual bookkeeping.

use crate::error::FlattenError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A bound pdfium library.
pub struct PdfEngine {
    pdfium: Pdfium,
}

impl PdfEngine {
    /// Bind pdfium from `explicit` if given, otherwise search next to the
    /// executable, then the working directory, then the system library path.
    pub fn bind(explicit: Option<&Path>) -> Result<Self, FlattenError> {
        if let Some(path) = explicit {
            let bindings = Pdfium::bind_to_library(path).map_err(|e| {
                FlattenError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
            })?;
            info!("Bound pdfium from {}", path.display());
            return Ok(Self {
                pdfium: Pdfium::new(bindings),
            });
        }

        for dir in library_search_dirs() {
            let lib_path = Pdfium::pdfium_platform_library_name_at_path(&dir);
            debug!("Trying pdfium at {:?}", lib_path);
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                info!("Bound pdfium from {:?}", lib_path);
                return Ok(Self {
                    pdfium: Pdfium::new(bindings),
                });
            }
        }

        debug!("Trying system pdfium library");
        Pdfium::bind_to_system_library()
            .map(|bindings| Self {
                pdfium: Pdfium::new(bindings),
            })
            .map_err(|e| FlattenError::PdfiumBindingFailed(format!("{:?}", e)))
    }

    /// Open `path` as a PDF with an optional user password.
    ///
    /// Fails with a load error for unparseable, locked or page-less documents.
    pub fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<SourceDocument<'a>, FlattenError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| classify_load_error(path, password.is_some(), e))?;

        let page_count = document.pages().len() as usize;
        if page_count == 0 {
            return Err(FlattenError::EmptyDocument {
                path: path.to_path_buf(),
            });
        }
        info!("PDF loaded: {} pages from {}", page_count, path.display());

        Ok(SourceDocument {
            path: path.to_path_buf(),
            document,
            page_count,
        })
    }
}

/// An open, non-empty source PDF.
pub struct SourceDocument<'a> {
    path: PathBuf,
    document: PdfDocument<'a>,
    page_count: usize,
}

impl<'a> SourceDocument<'a> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Page at 0-based `index`.
    ///
    /// An index outside `[0, page_count)` is a render error for that page.
    pub fn page(&self, index: usize) -> Result<SourcePage<'a>, FlattenError> {
        if index >= self.page_count {
            return Err(FlattenError::RenderFailed {
                page: index + 1,
                detail: format!("page out of range (document has {} pages)", self.page_count),
            });
        }
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| FlattenError::RenderFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;
        Ok(SourcePage { index, page })
    }
}

/// One page of a [`SourceDocument`].
pub struct SourcePage<'a> {
    index: usize,
    page: PdfPage<'a>,
}

impl<'a> SourcePage<'a> {
    /// 0-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width_pt(&self) -> f32 {
        self.page.width().value
    }

    pub fn height_pt(&self) -> f32 {
        self.page.height().value
    }

    pub(crate) fn raw(&self) -> &PdfPage<'a> {
        &self.page
    }
}

fn library_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir.join("libs"));
        dirs.push(exe_dir);
    }
    dirs.push(PathBuf::from("./"));
    dirs
}

fn classify_load_error(path: &Path, had_password: bool, err: PdfiumError) -> FlattenError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if had_password {
                FlattenError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                FlattenError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        }
        other => FlattenError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", other),
        },
    }
}
