//! Pipeline stages for PDF flattening.
//!
//! Each submodule implements exactly one transformation step, and pages flow
//! through them one at a time: a page's raster is encoded into the output
//! document before the next page is rendered.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ load ──▶ render ──▶ gray ──▶ encode ──▶ assemble
//! (path/bytes) (pdfium) (RGBA)    (luma)   (flate/jpeg) (lopdf, atomic write)
//! ```
//!
//! 1. [`input`]    — check the path exists, is readable and starts like a PDF
//! 2. [`load`]     — bind pdfium and open the document; empty documents fail here
//! 3. [`render`]   — rasterise one page at the configured DPI
//! 4. [`gray`]     — luminance-weighted RGBA → 8-bit gray
//! 5. [`encode`]   — wrap the gray samples as an image XObject
//! 6. [`assemble`] — one image per page into a new PDF, persisted atomically

pub mod assemble;
pub mod encode;
pub mod gray;
pub mod input;
pub mod load;
pub mod render;
