//! Page flattening: rasterise one page via pdfium and collapse it to gray.
//!
//! ## Why a fixed DPI, not a pixel cap?
//!
//! The output page size is derived back from the raster's pixel size, so
//! every page of a run must share one resolution for printed dimensions to
//! match the source. Target pixels are `round(points / 72 × dpi)` per axis;
//! a page that would exceed `max_rendered_pixels` fails instead of being
//! quietly downscaled.
//!
//! pdfium renders in print mode: content, annotations and form-field
//! appearances over opaque white, with optional-content (layer) visibility
//! taken from the Print usage and annotations lacking the Print flag left
//! out.

use crate::config::FlattenConfig;
use crate::error::FlattenError;
use crate::pipeline::gray;
use crate::pipeline::load::SourcePage;
use image::GrayImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// A flattened page: one gray raster plus the geometry it came from.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// 0-based index of the source page.
    pub page_index: usize,
    /// Source page width in points.
    pub width_pt: f32,
    /// Source page height in points.
    pub height_pt: f32,
    /// Resolution the raster was rendered at.
    pub dpi: u32,
    pub pixels: GrayImage,
}

impl RasterImage {
    /// 1-indexed page number.
    pub fn page_num(&self) -> usize {
        self.page_index + 1
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Output page size in points: pixel size converted back at `dpi`.
    pub fn output_size_pt(&self) -> (f32, f32) {
        let scale = POINTS_PER_INCH / self.dpi as f32;
        (self.width() as f32 * scale, self.height() as f32 * scale)
    }
}

/// Pixel size of a `width_pt × height_pt` page rendered at `dpi`.
///
/// Returns `None` for a degenerate (non-positive or non-finite) page size.
pub fn target_pixels(width_pt: f32, height_pt: f32, dpi: u32) -> Option<(u32, u32)> {
    if !(width_pt.is_finite() && height_pt.is_finite()) || width_pt <= 0.0 || height_pt <= 0.0 {
        return None;
    }
    let scale = dpi as f64 / POINTS_PER_INCH as f64;
    let to_px = |pt: f32| (pt as f64 * scale).round().clamp(1.0, u32::MAX as f64) as u32;
    Some((to_px(width_pt), to_px(height_pt)))
}

/// Render `page` at the configured DPI and convert it to gray.
pub fn render_page(page: &SourcePage<'_>, config: &FlattenConfig) -> Result<RasterImage, FlattenError> {
    let page_num = page.index() + 1;
    let (width_pt, height_pt) = (page.width_pt(), page.height_pt());

    let (width_px, height_px) =
        target_pixels(width_pt, height_pt, config.dpi).ok_or_else(|| FlattenError::RenderFailed {
            page: page_num,
            detail: format!("invalid page size {}x{} pt", width_pt, height_pt),
        })?;

    let limit = config.max_rendered_pixels;
    if width_px > limit || height_px > limit {
        return Err(FlattenError::PageTooLarge {
            page: page_num,
            width: width_px,
            height: height_px,
            limit,
        });
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(width_px as i32)
        .set_target_height(height_px as i32)
        .set_clear_color(PdfColor::new(255, 255, 255, 255))
        .render_annotations(true)
        .render_form_data(true)
        .use_print_quality(true);

    let bitmap = page
        .raw()
        .render_with_config(&render_config)
        .map_err(|e| FlattenError::RenderFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let rgba = bitmap.as_image().to_rgba8();
    let pixels = gray::to_gray(&rgba, config.grayscale);
    debug!(
        "Rendered page {} ({:.1}x{:.1} pt) → {}x{} px gray",
        page_num,
        width_pt,
        height_pt,
        pixels.width(),
        pixels.height()
    );

    Ok(RasterImage {
        page_index: page.index(),
        width_pt,
        height_pt,
        dpi: config.dpi,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_at_100_dpi() {
        assert_eq!(target_pixels(612.0, 792.0, 100), Some((850, 1100)));
    }

    #[test]
    fn a4_at_150_dpi_keeps_aspect() {
        let (w, h) = target_pixels(595.28, 841.89, 150).unwrap();
        assert_eq!((w, h), (1240, 1754));
        let src = 595.28f64 / 841.89;
        let out = w as f64 / h as f64;
        assert!((src - out).abs() < 1.0 / h as f64, "src {src} out {out}");
    }

    #[test]
    fn tiny_pages_get_at_least_one_pixel() {
        assert_eq!(target_pixels(0.1, 0.1, 36), Some((1, 1)));
    }

    #[test]
    fn degenerate_sizes_rejected() {
        assert_eq!(target_pixels(0.0, 792.0, 100), None);
        assert_eq!(target_pixels(612.0, -1.0, 100), None);
        assert_eq!(target_pixels(f32::NAN, 792.0, 100), None);
        assert_eq!(target_pixels(612.0, f32::INFINITY, 100), None);
    }

    #[test]
    fn output_size_round_trips_through_dpi() {
        let raster = RasterImage {
            page_index: 0,
            width_pt: 612.0,
            height_pt: 792.0,
            dpi: 100,
            pixels: GrayImage::new(850, 1100),
        };
        let (w, h) = raster.output_size_pt();
        assert!((w - 612.0).abs() < 0.01);
        assert!((h - 792.0).abs() < 0.01);
        assert_eq!(raster.page_num(), 1);
    }
}
