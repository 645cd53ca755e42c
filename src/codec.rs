//! Collaborator seams for turning bytes into pixels and back.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, codecs::jpeg::JpegEncoder};
use sha2::{Digest, Sha256};

use crate::{
    error::{ForensicsError, Result},
    pixel::PixelBuffer,
};

/// Upscaling factor a paged-document decoder should rasterize its first page at.
pub const PAGE_RENDER_SCALE: f32 = 2.0;

pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer>;
}

pub trait Reencoder: Send + Sync {
    /// Lossy round trip at `quality` (1..=100). The result must keep the
    /// input's dimensions.
    fn reencode(&self, buf: &PixelBuffer, quality: u8) -> Result<PixelBuffer>;
}

/// Raster decoder backed by the `image` crate. PDF input is recognised and
/// rejected; hosts that need it plug in their own page rasterizer.
pub struct RasterDecoder;

impl Decoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        if bytes.starts_with(b"%PDF-") {
            return Err(ForensicsError::UnsupportedFormat(format!(
                "PDF input needs a page rasterizer (first page at {PAGE_RENDER_SCALE}x)"
            )));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| ForensicsError::Decode(e.to_string()))?;

        Ok(PixelBuffer::from_dynamic(&image))
    }
}

pub struct JpegReencoder;

impl Reencoder for JpegReencoder {
    fn reencode(&self, buf: &PixelBuffer, quality: u8) -> Result<PixelBuffer> {
        if !(1..=100).contains(&quality) {
            return Err(ForensicsError::InvalidParameter(format!(
                "JPEG quality must be between 1 and 100, got {quality}"
            )));
        }

        let rgb = composite_on_black(buf);
        let mut buffer = Cursor::new(Vec::new());

        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| ForensicsError::Codec(e.to_string()))?;

        let recompressed = image::load_from_memory(&buffer.into_inner())
            .map_err(|e| ForensicsError::Codec(e.to_string()))?;
        let out = PixelBuffer::from_dynamic(&recompressed);

        if out.dimensions() != buf.dimensions() {
            return Err(ForensicsError::Codec(format!(
                "round trip changed dimensions from {:?} to {:?}",
                buf.dimensions(),
                out.dimensions()
            )));
        }

        Ok(out)
    }
}

/// Flattens alpha onto an opaque black backdrop, since JPEG has no alpha
/// channel.
pub fn composite_on_black(buf: &PixelBuffer) -> RgbImage {
    let samples = buf
        .pixels()
        .flat_map(|p| {
            let a = p[3] as u16;
            [0, 1, 2].map(|c| ((p[c] as u16 * a + 127) / 255) as u8)
        })
        .collect();

    RgbImage::from_raw(buf.width(), buf.height(), samples)
        .unwrap_or_else(|| RgbImage::new(buf.width(), buf.height()))
}

/// SHA-256 of the PNG encoding of the decoded bitmap, so the hash depends on
/// pixels only and not on the source container.
pub fn content_hash(buf: &PixelBuffer) -> Result<String> {
    let mut png = Cursor::new(Vec::new());
    buf.to_dynamic().write_to(&mut png, ImageFormat::Png)?;

    let mut hasher = Sha256::new();
    hasher.update(png.get_ref());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fingerprint::Fingerprint;

    fn encode(buf: &PixelBuffer, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        buf.to_dynamic().write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut samples = Vec::new();
        for y in 0..height {
            for x in 0..width {
                samples.extend([(x * 8) as u8, (y * 8) as u8, 128, 255]);
            }
        }
        PixelBuffer::new(width, height, samples).unwrap()
    }

    #[test]
    fn test_decoder_rejects_pdf() {
        let err = RasterDecoder.decode(b"%PDF-1.7\n...").unwrap_err();
        assert!(matches!(err, ForensicsError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_decoder_rejects_garbage() {
        let err = RasterDecoder.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ForensicsError::Decode(_)));
    }

    #[test]
    fn test_hash_ignores_container() {
        let buf = gradient(16, 16);
        let from_png = RasterDecoder.decode(&encode(&buf, ImageFormat::Png)).unwrap();
        let from_bmp = RasterDecoder.decode(&encode(&buf, ImageFormat::Bmp)).unwrap();

        let hash = content_hash(&from_png).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash(&from_bmp).unwrap());
    }

    #[test]
    fn test_alpha_composites_onto_black() {
        let buf = PixelBuffer::new(3, 1, vec![255, 255, 255, 255, 255, 100, 0, 128, 9, 9, 9, 0])
            .unwrap();
        let rgb = composite_on_black(&buf);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [128, 50, 0]);
        assert_eq!(rgb.get_pixel(2, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_lossless_round_trip_keeps_fingerprint() {
        // 53x37 forces the area downsample to blend pixels.
        let buf = gradient(53, 37);
        let decoded = RasterDecoder.decode(&encode(&buf, ImageFormat::Png)).unwrap();

        assert_eq!(decoded, buf);
        assert_eq!(
            Fingerprint::compute(&decoded).unwrap(),
            Fingerprint::compute(&buf).unwrap()
        );
    }

    #[test]
    fn test_jpeg_round_trip_keeps_dimensions() {
        let buf = gradient(20, 12);
        let out = JpegReencoder.reencode(&buf, 90).unwrap();
        assert_eq!(out.dimensions(), (20, 12));
    }

    #[test]
    fn test_jpeg_rejects_quality_zero() {
        assert!(JpegReencoder.reencode(&gradient(4, 4), 0).is_err());
    }
}
