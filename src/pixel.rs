use image::{DynamicImage, RgbaImage};

use crate::error::{ForensicsError, Result};

pub const CHANNELS: usize = 4;

/// A decoded raster as flat row-major RGBA samples.
///
/// Buffers are never mutated after construction; every transform in the
/// crate produces a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if samples.len() != expected {
            return Err(ForensicsError::InvalidBuffer {
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self { width, height, samples })
    }

    /// Builds a "grayscale-as-RGBA" map: each magnitude is written into R, G
    /// and B with a fully opaque alpha.
    pub fn from_magnitudes(width: u32, height: u32, magnitudes: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if magnitudes.len() != expected {
            return Err(ForensicsError::InvalidBuffer {
                expected: expected * CHANNELS,
                actual: magnitudes.len() * CHANNELS,
            });
        }

        let samples = magnitudes
            .iter()
            .flat_map(|&v| [v, v, v, 255])
            .collect();

        Ok(Self { width, height, samples })
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            samples: image.into_raw(),
        }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgba_image(image.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.samples.chunks_exact(CHANNELS)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.samples[i],
            self.samples[i + 1],
            self.samples[i + 2],
            self.samples[i + 3],
        ]
    }

    /// Red channel of every pixel; for magnitude maps this is the magnitude.
    pub fn magnitudes(&self) -> Vec<u8> {
        self.pixels().map(|p| p[0]).collect()
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length invariant is enforced by every constructor.
        RgbaImage::from_raw(self.width, self.height, self.samples.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.to_rgba_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_sample_count() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            ForensicsError::InvalidBuffer { expected: 16, actual: 15 }
        ));
    }

    #[test]
    fn test_magnitudes_are_opaque_gray() {
        let buf = PixelBuffer::from_magnitudes(2, 1, &[7, 200]).unwrap();
        assert_eq!(buf.pixel(0, 0), [7, 7, 7, 255]);
        assert_eq!(buf.pixel(1, 0), [200, 200, 200, 255]);
        assert_eq!(buf.magnitudes(), vec![7, 200]);
    }

    #[test]
    fn test_rgba_image_round_trip() {
        let buf = PixelBuffer::new(1, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let back = PixelBuffer::from_rgba_image(buf.to_rgba_image());
        assert_eq!(buf, back);
    }
}
