//! Configuration types for PDF flattening.
//!
//! All flattening behaviour is controlled through [`FlattenConfig`], built
//! via its [`FlattenConfigBuilder`]. The defaults are fixed constants rather
//! than per-document negotiation: every page of a run is rasterised at the
//! same resolution with the same grayscale formula and codec.

use crate::error::FlattenError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Rasterisation resolution used when no DPI is configured.
///
/// 100 DPI keeps body text legible on a laser printer while a US Letter page
/// stays under one megapixel of 8-bit gray.
pub const DEFAULT_DPI: u32 = 100;

/// Lowest accepted DPI.
pub const MIN_DPI: u32 = 36;

/// Highest accepted DPI.
pub const MAX_DPI: u32 = 600;

/// Default JPEG quality when [`RasterCodec::Jpeg`] is selected.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Default cap on either rendered edge, in pixels.
pub const DEFAULT_MAX_RENDERED_PIXELS: u32 = 20_000;

/// Configuration for a flattening run.
///
/// Built via [`FlattenConfig::builder()`] or using
/// [`FlattenConfig::default()`].
///
/// # Example
/// ```rust
/// use spool_flatten::{FlattenConfig, RasterCodec};
///
/// let config = FlattenConfig::builder()
///     .dpi(150)
///     .codec(RasterCodec::Flate)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct FlattenConfig {
    /// Rasterisation DPI. Range: 36–600. Default: [`DEFAULT_DPI`].
    ///
    /// Output page size is derived back from the pixel size at this DPI, so
    /// changing it alters file size and sharpness but not the printed
    /// dimensions.
    pub dpi: u32,

    /// Codec used for each page raster. Default: [`RasterCodec::Flate`].
    pub codec: RasterCodec,

    /// JPEG quality 1–100, only read when `codec` is [`RasterCodec::Jpeg`].
    pub jpeg_quality: u8,

    /// Luminance weights for the RGB → gray conversion.
    pub grayscale: GrayscaleWeights,

    /// Hard limit on either rendered edge in pixels. Default: 20 000.
    ///
    /// Pages whose target size exceeds this fail with
    /// [`FlattenError::PageTooLarge`] instead of being silently downscaled,
    /// which would change the effective DPI of a single page.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit pdfium shared library. If None, the library is searched next
    /// to the executable, in the working directory, then system-wide.
    pub pdfium_library: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            codec: RasterCodec::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            grayscale: GrayscaleWeights::default(),
            max_rendered_pixels: DEFAULT_MAX_RENDERED_PIXELS,
            password: None,
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FlattenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenConfig")
            .field("dpi", &self.dpi)
            .field("codec", &self.codec)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("grayscale", &self.grayscale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn FlattenProgressCallback>"),
            )
            .finish()
    }
}

impl FlattenConfig {
    /// Create a new builder for `FlattenConfig`.
    pub fn builder() -> FlattenConfigBuilder {
        FlattenConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check value ranges. Called by the builder and again at the start of
    /// every run, since fields are public.
    pub fn validate(&self) -> Result<(), FlattenError> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(FlattenError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(FlattenError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_rendered_pixels == 0 {
            return Err(FlattenError::InvalidConfig(
                "max_rendered_pixels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`FlattenConfig`].
#[derive(Debug)]
pub struct FlattenConfigBuilder {
    config: FlattenConfig,
}

impl FlattenConfigBuilder {
    /// Set the DPI. Validated in [`build`](Self::build), not clamped, so a
    /// typo never silently changes the output resolution.
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn codec(mut self, codec: RasterCodec) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn grayscale(mut self, weights: GrayscaleWeights) -> Self {
        self.config.grayscale = weights;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FlattenConfig, FlattenError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How each page raster is stored inside the output PDF.
///
/// | Codec | PDF filter | Fidelity |
/// |-------|------------|----------|
/// | `Flate` | `FlateDecode` | lossless (default) |
/// | `Jpeg`  | `DCTDecode`   | lossy, usually smaller for photos |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterCodec {
    #[default]
    Flate,
    Jpeg,
}

impl fmt::Display for RasterCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RasterCodec::Flate => "flate",
            RasterCodec::Jpeg => "jpeg",
        })
    }
}

/// Luminance weighting used to collapse RGB into a single gray channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrayscaleWeights {
    /// ITU-R BT.601: 0.299 R + 0.587 G + 0.114 B. (default)
    #[default]
    Rec601,
    /// ITU-R BT.709: 0.2126 R + 0.7152 G + 0.0722 B.
    Rec709,
}

impl GrayscaleWeights {
    /// Weights in 16.16 fixed point; each triple sums to exactly `1 << 16`.
    pub const fn fixed_point(self) -> [u32; 3] {
        match self {
            GrayscaleWeights::Rec601 => [19_595, 38_470, 7_471],
            GrayscaleWeights::Rec709 => [13_933, 46_871, 4_732],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_named_constants() {
        let c = FlattenConfig::default();
        assert_eq!(c.dpi, DEFAULT_DPI);
        assert_eq!(c.codec, RasterCodec::Flate);
        assert_eq!(c.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(c.grayscale, GrayscaleWeights::Rec601);
        assert!(c.password.is_none());
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        assert!(FlattenConfig::builder().dpi(10).build().is_err());
        assert!(FlattenConfig::builder().dpi(1200).build().is_err());
        assert!(FlattenConfig::builder().dpi(MIN_DPI).build().is_ok());
        assert!(FlattenConfig::builder().dpi(MAX_DPI).build().is_ok());
    }

    #[test]
    fn builder_rejects_bad_jpeg_quality() {
        let err = FlattenConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(matches!(err, FlattenError::InvalidConfig(_)));
        assert!(FlattenConfig::builder().jpeg_quality(101).build().is_err());
    }

    #[test]
    fn grayscale_weights_sum_to_one() {
        for w in [GrayscaleWeights::Rec601, GrayscaleWeights::Rec709] {
            assert_eq!(w.fixed_point().iter().sum::<u32>(), 1 << 16, "{w:?}");
        }
    }

    #[test]
    fn validate_catches_mutated_fields() {
        let mut c = FlattenConfig::default();
        assert!(c.validate().is_ok());
        c.dpi = 5;
        assert!(c.validate().is_err());
        c.dpi = DEFAULT_DPI;
        c.max_rendered_pixels = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = FlattenConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
