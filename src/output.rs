//! Result types returned by the flatten entry points.

use crate::config::RasterCodec;
use serde::{Deserialize, Serialize};

/// Assembled output held in memory, plus its run report.
#[derive(Debug, Clone)]
pub struct FlattenOutput {
    /// The complete flattened PDF.
    pub pdf: Vec<u8>,
    pub stats: FlattenStats,
}

/// Per-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenStats {
    /// Pages in the source document, which always equals pages written.
    pub page_count: usize,
    pub dpi: u32,
    pub codec: RasterCodec,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// Wall time spent rasterising pages to gray, excluding encoding.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
    pub pages: Vec<PageSummary>,
}

impl FlattenStats {
    /// Output size as a percentage of input size, or `None` for an empty input.
    pub fn size_ratio_percent(&self) -> Option<f64> {
        if self.input_bytes == 0 {
            None
        } else {
            Some(self.output_bytes as f64 / self.input_bytes as f64 * 100.0)
        }
    }
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width_pt: f32,
    pub height_pt: f32,
    pub width_px: u32,
    pub height_px: u32,
    /// Size of the page's image stream inside the output.
    pub encoded_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(input: u64, output: u64) -> FlattenStats {
        FlattenStats {
            page_count: 1,
            dpi: 100,
            codec: RasterCodec::Flate,
            input_bytes: input,
            output_bytes: output,
            render_duration_ms: 5,
            total_duration_ms: 7,
            pages: vec![PageSummary {
                page_num: 1,
                width_pt: 612.0,
                height_pt: 792.0,
                width_px: 850,
                height_px: 1100,
                encoded_bytes: 4096,
            }],
        }
    }

    #[test]
    fn size_ratio() {
        assert_eq!(stats(200, 50).size_ratio_percent(), Some(25.0));
        assert_eq!(stats(0, 50).size_ratio_percent(), None);
    }

    #[test]
    fn stats_serialise_codec_lowercase() {
        let json = serde_json::to_string(&stats(10, 5)).unwrap();
        assert!(json.contains(r#""codec":"flate""#), "got: {json}");
        assert!(json.contains(r#""page_num":1"#));
    }
}
