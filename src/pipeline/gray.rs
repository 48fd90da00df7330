//! RGBA → 8-bit gray conversion.
//!
//! Residual alpha is composited over white (paper), then the three colour
//! channels are weighted by [`GrayscaleWeights`] in 16.16 fixed point. The
//! weights of each table sum to exactly `1 << 16`, so a pixel with equal
//! channels maps to that same value: flattening an already-gray page leaves
//! its tones unchanged.

use crate::config::GrayscaleWeights;
use image::{GrayImage, Luma, RgbaImage};

/// Convert a rendered RGBA raster into a gray raster of the same size.
pub fn to_gray(rgba: &RgbaImage, weights: GrayscaleWeights) -> GrayImage {
    let [wr, wg, wb] = weights.fixed_point();
    let mut out = GrayImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let y = wr * over_white(r, a) + wg * over_white(g, a) + wb * over_white(b, a);
        *dst = Luma([((y + (1 << 15)) >> 16) as u8]);
    }
    out
}

#[inline]
fn over_white(c: u8, a: u8) -> u32 {
    let (c, a) = (c as u32, a as u32);
    (c * a + 255 * (255 - a) + 127) / 255
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single(px: [u8; 4], weights: GrayscaleWeights) -> u8 {
        let img = RgbaImage::from_pixel(1, 1, Rgba(px));
        to_gray(&img, weights).get_pixel(0, 0).0[0]
    }

    #[test]
    fn equal_channels_are_unchanged() {
        for w in [GrayscaleWeights::Rec601, GrayscaleWeights::Rec709] {
            for v in 0..=255u8 {
                assert_eq!(single([v, v, v, 255], w), v, "{w:?} at {v}");
            }
        }
    }

    #[test]
    fn luminance_weighted_not_averaged() {
        // A plain average would give 85 for every primary.
        let red = single([255, 0, 0, 255], GrayscaleWeights::Rec601);
        let green = single([0, 255, 0, 255], GrayscaleWeights::Rec601);
        let blue = single([0, 0, 255, 255], GrayscaleWeights::Rec601);
        assert_eq!(red, 76);
        assert_eq!(green, 150);
        assert_eq!(blue, 29);
        assert!(green > red && red > blue);
    }

    #[test]
    fn rec709_weights_green_heavier() {
        let g601 = single([0, 255, 0, 255], GrayscaleWeights::Rec601);
        let g709 = single([0, 255, 0, 255], GrayscaleWeights::Rec709);
        assert_eq!(g709, 182);
        assert!(g709 > g601);
    }

    #[test]
    fn transparent_is_paper_white() {
        assert_eq!(single([0, 0, 0, 0], GrayscaleWeights::Rec601), 255);
        // Half-transparent black lands mid-gray.
        let half = single([0, 0, 0, 128], GrayscaleWeights::Rec601);
        assert!((126..=128).contains(&half), "got {half}");
    }

    #[test]
    fn dimensions_preserved() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([10, 20, 30, 255]));
        let gray = to_gray(&img, GrayscaleWeights::default());
        assert_eq!(gray.dimensions(), (7, 3));
    }
}
