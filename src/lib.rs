//! # spool-flatten
//!
//! Flatten PDF documents into image-only grayscale PDFs.
//!
//! Every page is rasterised at a fixed DPI, collapsed to 8-bit luminance and
//! written back as a single full-page image. The result prints identically on
//! any device: no fonts, no transparency groups, no colour management, no
//! interactive content left to interpret.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check path / stage bytes, sniff the %PDF header
//!  ├─ 2. Load      bind pdfium, open the document, reject 0 pages
//!  ├─ 3. Render    rasterise page N at the configured DPI over white
//!  ├─ 4. Gray      luminance-weighted RGBA → 8-bit gray
//!  ├─ 5. Encode    FlateDecode (lossless) or DCTDecode image XObject
//!  └─ 6. Assemble  one page per raster, serialised, written atomically
//! ```
//!
//! Pages go through steps 3 to 5 one at a time, in document order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spool_flatten::{flatten_to_file, FlattenConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FlattenConfig::builder().dpi(150).build()?;
//!     let stats = flatten_to_file("report.pdf", "report-gray.pdf", &config)?;
//!     eprintln!("{} pages, {} bytes", stats.page_count, stats.output_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `spoolflat` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! spool-flatten = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! pdfium is loaded dynamically. See [`PdfEngine::bind`] for the search
//! order, or set [`FlattenConfig::pdfium_library`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod flatten;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FlattenConfig, FlattenConfigBuilder, GrayscaleWeights, RasterCodec, DEFAULT_DPI,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_RENDERED_PIXELS, MAX_DPI, MIN_DPI,
};
pub use error::{ErrorKind, FlattenError};
pub use flatten::{flatten, flatten_from_bytes, flatten_to_file};
pub use output::{FlattenOutput, FlattenStats, PageSummary};
pub use pipeline::load::PdfEngine;
pub use pipeline::render::RasterImage;
pub use progress::{FlattenProgressCallback, NoopProgressCallback, ProgressCallback};
