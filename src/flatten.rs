//! Flattening entry points.
//!
//! All three entry points share one page loop: each page is rendered,
//! converted to gray and encoded into the output document before the next
//! page is touched, so peak memory is one page raster plus the compressed
//! output built so far.
//!
//! The first failure aborts the run. [`flatten_to_file`] only touches the
//! destination after the whole document has been serialised, so a failed run
//! leaves any existing file at that path unchanged.

use crate::config::FlattenConfig;
use crate::error::FlattenError;
use crate::output::{FlattenOutput, FlattenStats};
use crate::pipeline::assemble::{self, PdfAssembler};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::load::PdfEngine;
use crate::pipeline::render;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pages between progress lines at info level.
const LOG_EVERY_PAGES: usize = 10;

/// Flatten the PDF at `input` and return the new document in memory.
///
/// # Errors
/// - Load: missing, unreadable, non-PDF, corrupt, locked or page-less input
/// - Render: any page failed to rasterise or exceeds the pixel cap
/// - Write: the output document could not be encoded or serialised
/// - Setup: invalid configuration or no pdfium library
pub fn flatten(input: impl AsRef<Path>, config: &FlattenConfig) -> Result<FlattenOutput, FlattenError> {
    config.validate()?;
    let resolved = input::resolve_local(input.as_ref())?;
    run(&resolved, config, None)
}

/// Flatten the PDF at `input` and write the result to `output` atomically.
///
/// The output directory is checked before any page is rendered, so a bad
/// destination fails fast. The file itself is written through a temp file in
/// the same directory and renamed into place.
pub fn flatten_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FlattenConfig,
) -> Result<FlattenStats, FlattenError> {
    config.validate()?;
    let output = output.as_ref();
    let resolved = input::resolve_local(input.as_ref())?;
    let flattened = run(&resolved, config, Some(output))?;

    assemble::write_atomic(output, &flattened.pdf)?;
    let stats = flattened.stats;
    match stats.size_ratio_percent() {
        Some(ratio) => info!(
            "Wrote {} ({} → {} bytes, {:.1}% of original)",
            output.display(),
            stats.input_bytes,
            stats.output_bytes,
            ratio
        ),
        None => info!("Wrote {} ({} bytes)", output.display(), stats.output_bytes),
    }
    Ok(stats)
}

/// Flatten a PDF held in memory.
///
/// The bytes are staged in a managed temp file for pdfium and removed on
/// return, including on error.
///
/// # Example
/// ```rust,no_run
/// use spool_flatten::{flatten_from_bytes, FlattenConfig};
///
/// let bytes = std::fs::read("scan.pdf").unwrap();
/// let output = flatten_from_bytes(&bytes, &FlattenConfig::default()).unwrap();
/// std::fs::write("scan-gray.pdf", &output.pdf).unwrap();
/// ```
pub fn flatten_from_bytes(bytes: &[u8], config: &FlattenConfig) -> Result<FlattenOutput, FlattenError> {
    config.validate()?;
    let resolved = input::stage_bytes(bytes)?;
    run(&resolved, config, None)
}

fn run(
    resolved: &ResolvedInput,
    config: &FlattenConfig,
    destination: Option<&Path>,
) -> Result<FlattenOutput, FlattenError> {
    let total_start = Instant::now();
    info!(
        "Flattening {} at {} DPI ({} codec, {:?} weights)",
        resolved.path().display(),
        config.dpi,
        config.codec,
        config.grayscale
    );

    let engine = PdfEngine::bind(config.pdfium_library.as_deref())?;
    let document = engine.open(resolved.path(), config.password.as_deref())?;
    let total_pages = document.page_count();

    if let Some(dest) = destination {
        assemble::check_destination(dest)?;
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_flatten_start(total_pages);
    }

    let mut assembler = PdfAssembler::new(config.codec, config.jpeg_quality);
    let mut pages = Vec::with_capacity(total_pages);
    let mut render_time = Duration::ZERO;

    for index in 0..total_pages {
        let page_num = index + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        let render_start = Instant::now();
        let page = document.page(index)?;
        let raster = render::render_page(&page, config)?;
        drop(page);
        render_time += render_start.elapsed();

        let summary = assembler.add_page(raster)?;
        debug!(
            "Page {}/{}: {}x{} px, {} bytes",
            page_num, total_pages, summary.width_px, summary.height_px, summary.encoded_bytes
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_flattened(page_num, total_pages, summary.encoded_bytes);
        }
        pages.push(summary);

        if page_num % LOG_EVERY_PAGES == 0 {
            info!("Processed {}/{} pages", page_num, total_pages);
        }
    }

    // Close the source before serialising the output.
    drop(document);
    drop(engine);

    let pdf = assembler.finish()?;
    let stats = FlattenStats {
        page_count: pages.len(),
        dpi: config.dpi,
        codec: config.codec,
        input_bytes: resolved.size(),
        output_bytes: pdf.len() as u64,
        render_duration_ms: render_time.as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        pages,
    };

    info!(
        "Flattened {} pages in {}ms ({}ms rendering)",
        stats.page_count, stats.total_duration_ms, stats.render_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_flatten_complete(stats.page_count, stats.output_bytes);
    }

    Ok(FlattenOutput { pdf, stats })
}
