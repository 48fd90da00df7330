//! Output assembly: one image-only page per raster, written atomically.
//!
//! [`PdfAssembler`] appends pages as they are flattened, so each raster is
//! encoded and dropped before the next page renders. [`write_atomic`] stages
//! the serialised document in a temp file next to the destination and
//! renames it into place; a failed run never leaves a truncated file.

use crate::config::RasterCodec;
use crate::error::FlattenError;
use crate::output::PageSummary;
use crate::pipeline::encode;
use crate::pipeline::render::RasterImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_NAME: &str = "Im1";

/// Builds the output PDF page by page.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    codec: RasterCodec,
    jpeg_quality: u8,
}

impl PdfAssembler {
    pub fn new(codec: RasterCodec, jpeg_quality: u8) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            codec,
            jpeg_quality,
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append `raster` as the next page. The raster is consumed.
    pub fn add_page(&mut self, raster: RasterImage) -> Result<PageSummary, FlattenError> {
        let page_num = raster.page_num();
        let image = encode::encode_raster(&raster, self.codec, self.jpeg_quality)?;
        let encoded_bytes = image.content.len();
        let image_id = self.doc.add_object(image);

        let (width_pt, height_pt) = raster.output_size_pt();
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width_pt.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        height_pt.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|e| FlattenError::EncodeFailed {
            page: page_num,
            detail: e.to_string(),
        })?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([(IMAGE_NAME, Object::Reference(image_id))])),
        )]);

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    width_pt.into(),
                    height_pt.into(),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]));
        self.kids.push(Object::Reference(page_id));

        debug!(
            "Assembled page {} at {:.1}x{:.1} pt ({} image bytes)",
            page_num, width_pt, height_pt, encoded_bytes
        );

        Ok(PageSummary {
            page_num,
            width_pt: raster.width_pt,
            height_pt: raster.height_pt,
            width_px: raster.width(),
            height_px: raster.height(),
            encoded_bytes,
        })
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, FlattenError> {
        let count = self.kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(std::mem::take(&mut self.kids))),
            ("Count", Object::Integer(count)),
        ]);
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        let info_id = self.doc.add_object(Dictionary::from_iter([(
            "Producer",
            Object::string_literal(concat!("spool-flatten ", env!("CARGO_PKG_VERSION"))),
        )]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        self.doc.compress();

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| FlattenError::SerializeFailed(e.to_string()))?;
        Ok(out)
    }
}

/// Check that `dest` can be written: its parent directory exists and `dest`
/// is neither a directory nor a read-only file.
pub fn check_destination(dest: &Path) -> Result<(), FlattenError> {
    destination_dir(dest).map(|_| ())
}

/// Persist `bytes` at `dest` atomically.
///
/// On any error the destination is left exactly as it was and the staging
/// file is removed.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), FlattenError> {
    let dir = destination_dir(dest)?;
    let write_err = |source: std::io::Error| FlattenError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".spoolflat-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(write_err)?;
    staged.write_all(bytes).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;
    match std::fs::metadata(dest) {
        Ok(existing) => std::fs::set_permissions(staged.path(), existing.permissions())
            .map_err(write_err)?,
        Err(_) => default_permissions(staged.path()).map_err(write_err)?,
    }

    staged.persist(dest).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

fn destination_dir(dest: &Path) -> Result<PathBuf, FlattenError> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Err(FlattenError::OutputDirMissing { path: dir });
    }
    if let Ok(existing) = std::fs::metadata(dest) {
        if existing.is_dir() {
            return Err(FlattenError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: std::io::Error::other("destination is a directory"),
            });
        }
        // persist() would otherwise replace it through the directory.
        if existing.permissions().readonly() {
            return Err(FlattenError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "destination file is read-only",
                ),
            });
        }
    }
    Ok(dir)
}

#[cfg(unix)]
fn default_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
