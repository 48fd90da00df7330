//! Raster encoding: gray raster → PDF image XObject stream.
//!
//! [`RasterCodec::Flate`] deflates the raw 8-bit samples (`FlateDecode`),
//! which is lossless and keeps text edges crisp. [`RasterCodec::Jpeg`] emits
//! a baseline gray JPEG (`DCTDecode`) for callers who prefer smaller files
//! over exact pixels.

use crate::config::RasterCodec;
use crate::error::FlattenError;
use crate::pipeline::render::RasterImage;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;
use tracing::debug;

/// Encode `raster` as a `DeviceGray` image XObject.
pub fn encode_raster(
    raster: &RasterImage,
    codec: RasterCodec,
    jpeg_quality: u8,
) -> Result<Stream, FlattenError> {
    let (width, height) = (raster.width(), raster.height());
    let samples = raster.pixels.as_raw();

    let (filter, data): (&[u8], Vec<u8>) = match codec {
        RasterCodec::Flate => {
            let data = deflate(samples).map_err(|e| encode_err(raster, e))?;
            (&b"FlateDecode"[..], data)
        }
        RasterCodec::Jpeg => {
            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality)
                .encode(samples, width, height, ExtendedColorType::L8)
                .map_err(|e| encode_err(raster, e))?;
            (&b"DCTDecode"[..], buf)
        }
    };

    debug!(
        "Encoded page {} ({}x{} px) as {} → {} bytes",
        raster.page_num(),
        width,
        height,
        codec,
        data.len()
    );

    let dict = Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(filter.to_vec())),
    ]);

    // Already filtered; keep Document::compress from touching it.
    Ok(Stream::new(dict, data).with_compression(false))
}

fn deflate(samples: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    encoder.finish()
}

fn encode_err(raster: &RasterImage, e: impl std::fmt::Display) -> FlattenError {
    FlattenError::EncodeFailed {
        page: raster.page_num(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{GrayImage, Luma};
    use std::io::Read;

    fn raster(w: u32, h: u32) -> RasterImage {
        RasterImage {
            page_index: 4,
            width_pt: w as f32 * 0.72,
            height_pt: h as f32 * 0.72,
            dpi: 100,
            pixels: GrayImage::from_fn(w, h, |x, y| Luma([((x + y) % 256) as u8])),
        }
    }

    fn name<'a>(dict: &'a Dictionary, key: &[u8]) -> &'a [u8] {
        match dict.get(key) {
            Ok(Object::Name(n)) => n,
            other => panic!("expected name for {:?}, got {:?}", key, other),
        }
    }

    #[test]
    fn flate_stream_is_lossless_device_gray() {
        let r = raster(40, 30);
        let stream = encode_raster(&r, RasterCodec::Flate, 75).expect("encode");
        assert_eq!(name(&stream.dict, b"ColorSpace"), b"DeviceGray".as_slice());
        assert_eq!(name(&stream.dict, b"Filter"), b"FlateDecode".as_slice());
        assert!(matches!(stream.dict.get(b"Width"), Ok(Object::Integer(40))));
        assert!(matches!(stream.dict.get(b"Height"), Ok(Object::Integer(30))));

        let mut decoded = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, r.pixels.into_raw());
    }

    #[test]
    fn jpeg_stream_is_dct_gray() {
        let stream = encode_raster(&raster(64, 64), RasterCodec::Jpeg, 60).expect("encode");
        assert_eq!(name(&stream.dict, b"Filter"), b"DCTDecode".as_slice());
        assert_eq!(name(&stream.dict, b"ColorSpace"), b"DeviceGray".as_slice());
        // JPEG SOI marker.
        assert_eq!(&stream.content[..2], &[0xFFu8, 0xD8]);
    }

    #[test]
    fn flat_page_compresses_well() {
        let blank = RasterImage {
            pixels: GrayImage::from_pixel(850, 1100, Luma([255])),
            ..raster(1, 1)
        };
        let stream = encode_raster(&blank, RasterCodec::Flate, 75).unwrap();
        assert!(stream.content.len() < 850 * 1100 / 100, "{} bytes", stream.content.len());
    }
}
